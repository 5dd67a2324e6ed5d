//! In-process `SocialStore` used for local development and the test suite.
//!
//! Mirrors the Postgres schema rules: reference checks stand in for foreign
//! keys, post deletion cascades to comments and likes, and one like per
//! (post, user).

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::database::models::{
    Comment, Hashtag, Like, LikeToggle, NewPost, NewProfile, NewUser, Post, PostChanges, Profile,
    ProfileChanges, User,
};
use crate::database::store::{SocialStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    hashtags: BTreeMap<i64, Hashtag>,
    posts: BTreeMap<i64, Post>,
    profiles: BTreeMap<i64, Profile>,
    comments: BTreeMap<i64, Comment>,
    likes: BTreeMap<i64, Like>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_user(&self, id: i64) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference("user does not exist".to_string()))
        }
    }

    fn require_post(&self, id: i64) -> StoreResult<()> {
        if self.posts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference("post does not exist".to_string()))
        }
    }

    /// Sorted, de-duplicated hashtag ids, all of which must exist
    fn checked_hashtags(&self, ids: &[i64]) -> StoreResult<Vec<i64>> {
        if ids.iter().any(|id| !self.hashtags.contains_key(id)) {
            return Err(StoreError::InvalidReference("hashtag does not exist".to_string()));
        }
        Ok(sorted_unique(ids))
    }

    fn checked_follows(&self, profile_id: i64, ids: &[i64]) -> StoreResult<Vec<i64>> {
        if ids.iter().any(|id| *id == profile_id || !self.profiles.contains_key(id)) {
            return Err(StoreError::InvalidReference(
                "followed profile does not exist or is the profile itself".to_string(),
            ));
        }
        Ok(sorted_unique(ids))
    }

    fn profile_by_user(&self, user_id: i64) -> Option<&Profile> {
        self.profiles.values().find(|p| p.user == user_id)
    }
}

fn sorted_unique(ids: &[i64]) -> Vec<i64> {
    let mut out = ids.to_vec();
    out.sort_unstable();
    out.dedup();
    out
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SocialStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!("username '{}' is taken", user.username)));
        }
        let id = t.next_id();
        let row = User {
            id,
            username: user.username,
            email: user.email,
            created_at: Utc::now(),
        };
        t.users.insert(id, row.clone());
        Ok(row)
    }

    async fn list_hashtags(&self) -> StoreResult<Vec<Hashtag>> {
        Ok(self.tables.read().await.hashtags.values().cloned().collect())
    }

    async fn get_hashtag(&self, id: i64) -> StoreResult<Option<Hashtag>> {
        Ok(self.tables.read().await.hashtags.get(&id).cloned())
    }

    async fn create_hashtag(&self, name: String) -> StoreResult<Hashtag> {
        let mut t = self.tables.write().await;
        let id = t.next_id();
        let row = Hashtag { id, name };
        t.hashtags.insert(id, row.clone());
        Ok(row)
    }

    async fn update_hashtag(&self, id: i64, name: String) -> StoreResult<Option<Hashtag>> {
        let mut t = self.tables.write().await;
        Ok(t.hashtags.get_mut(&id).map(|h| {
            h.name = name;
            h.clone()
        }))
    }

    async fn delete_hashtag(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.hashtags.remove(&id).is_none() {
            return Ok(false);
        }
        for post in t.posts.values_mut() {
            post.hashtags.retain(|h| *h != id);
        }
        Ok(true)
    }

    async fn list_posts(&self, hashtags: Option<&[i64]>) -> StoreResult<Vec<Post>> {
        let t = self.tables.read().await;
        Ok(t.posts
            .values()
            .filter(|p| hashtags.map_or(true, |ids| p.tagged_with_any(ids)))
            .cloned()
            .collect())
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut t = self.tables.write().await;
        t.require_user(post.user)?;
        let hashtags = t.checked_hashtags(&post.hashtags)?;
        let id = t.next_id();
        let row = Post {
            id,
            user: post.user,
            content: post.content,
            image: None,
            hashtags,
            created_at: Utc::now(),
        };
        t.posts.insert(id, row.clone());
        Ok(row)
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut t = self.tables.write().await;
        let hashtags = match &changes.hashtags {
            Some(ids) => Some(t.checked_hashtags(ids)?),
            None => None,
        };
        Ok(t.posts.get_mut(&id).map(|post| {
            if let Some(content) = changes.content {
                post.content = content;
            }
            if let Some(hashtags) = hashtags {
                post.hashtags = hashtags;
            }
            post.clone()
        }))
    }

    async fn set_post_image(&self, id: i64, image: String) -> StoreResult<Option<Post>> {
        let mut t = self.tables.write().await;
        Ok(t.posts.get_mut(&id).map(|post| {
            post.image = Some(image);
            post.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.posts.remove(&id).is_none() {
            return Ok(false);
        }
        t.comments.retain(|_, c| c.post != id);
        t.likes.retain(|_, l| l.post != id);
        Ok(true)
    }

    async fn list_profiles(&self, search: &[String]) -> StoreResult<Vec<Profile>> {
        let t = self.tables.read().await;
        Ok(t.profiles
            .values()
            .filter(|p| p.matches_search(search))
            .cloned()
            .collect())
    }

    async fn get_profile(&self, id: i64) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn get_profile_by_user(&self, user_id: i64) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profile_by_user(user_id).cloned())
    }

    async fn get_or_create_profile(&self, user_id: i64, profile: NewProfile) -> StoreResult<(Profile, bool)> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.profile_by_user(user_id) {
            return Ok((existing.clone(), false));
        }

        let username = t
            .users
            .get(&user_id)
            .map(|u| u.username.clone())
            .ok_or_else(|| StoreError::InvalidReference("user does not exist".to_string()))?;
        let id = t.next_id();
        let follow_profiles = t.checked_follows(id, &profile.follow_profiles)?;

        let row = Profile {
            id,
            user: user_id,
            username,
            first_name: profile.first_name,
            last_name: profile.last_name,
            bio: profile.bio,
            email: profile.email,
            follow_profiles,
        };
        t.profiles.insert(id, row.clone());
        Ok((row, true))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> StoreResult<Option<Profile>> {
        let mut t = self.tables.write().await;
        if !t.profiles.contains_key(&id) {
            return Ok(None);
        }
        let follows = match &changes.follow_profiles {
            Some(ids) => Some(t.checked_follows(id, ids)?),
            None => None,
        };

        Ok(t.profiles.get_mut(&id).map(|p| {
            if let Some(v) = changes.first_name {
                p.first_name = v;
            }
            if let Some(v) = changes.last_name {
                p.last_name = v;
            }
            if let Some(v) = changes.bio {
                p.bio = v;
            }
            if let Some(v) = changes.email {
                p.email = v;
            }
            if let Some(v) = follows {
                p.follow_profiles = v;
            }
            p.clone()
        }))
    }

    async fn add_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        t.checked_follows(profile_id, &[target_id])?;
        let profile = t
            .profiles
            .get_mut(&profile_id)
            .ok_or_else(|| StoreError::InvalidReference("profile does not exist".to_string()))?;
        if profile.follows(target_id) {
            return Ok(false);
        }
        profile.follow_profiles.push(target_id);
        profile.follow_profiles.sort_unstable();
        Ok(true)
    }

    async fn remove_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(match t.profiles.get_mut(&profile_id) {
            Some(profile) => {
                let before = profile.follow_profiles.len();
                profile.follow_profiles.retain(|id| *id != target_id);
                profile.follow_profiles.len() != before
            }
            None => false,
        })
    }

    async fn list_comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>> {
        let t = self.tables.read().await;
        Ok(t.comments.values().filter(|c| c.user == user_id).cloned().collect())
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn create_comment(&self, post_id: i64, user_id: i64, content: String) -> StoreResult<Comment> {
        let mut t = self.tables.write().await;
        t.require_post(post_id)?;
        t.require_user(user_id)?;
        let id = t.next_id();
        let row = Comment {
            id,
            post: post_id,
            user: user_id,
            content,
            created_at: Utc::now(),
        };
        t.comments.insert(id, row.clone());
        Ok(row)
    }

    async fn update_comment(&self, id: i64, content: String) -> StoreResult<Option<Comment>> {
        let mut t = self.tables.write().await;
        Ok(t.comments.get_mut(&id).map(|c| {
            c.content = content;
            c.clone()
        }))
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }

    async fn list_likes(&self) -> StoreResult<Vec<Like>> {
        Ok(self.tables.read().await.likes.values().cloned().collect())
    }

    async fn get_like(&self, id: i64) -> StoreResult<Option<Like>> {
        Ok(self.tables.read().await.likes.get(&id).cloned())
    }

    async fn find_like(&self, post_id: i64, user_id: i64) -> StoreResult<Option<Like>> {
        let t = self.tables.read().await;
        Ok(t.likes
            .values()
            .find(|l| l.post == post_id && l.user == user_id)
            .cloned())
    }

    async fn create_like(&self, post_id: i64, user_id: i64, is_liked: bool) -> StoreResult<Like> {
        let mut t = self.tables.write().await;
        t.require_post(post_id)?;
        t.require_user(user_id)?;
        if t.likes.values().any(|l| l.post == post_id && l.user == user_id) {
            return Err(StoreError::Conflict("post and user must make a unique set".to_string()));
        }
        let id = t.next_id();
        let row = Like {
            id,
            post: post_id,
            user: user_id,
            is_liked,
        };
        t.likes.insert(id, row.clone());
        Ok(row)
    }

    async fn update_like(&self, id: i64, is_liked: bool) -> StoreResult<Option<Like>> {
        let mut t = self.tables.write().await;
        Ok(t.likes.get_mut(&id).map(|l| {
            l.is_liked = is_liked;
            l.clone()
        }))
    }

    async fn delete_like(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.likes.remove(&id).is_some())
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> StoreResult<LikeToggle> {
        let mut t = self.tables.write().await;
        let existing = t
            .likes
            .iter()
            .find(|(_, l)| l.post == post_id && l.user == user_id)
            .map(|(id, _)| *id);

        if let Some(id) = existing {
            t.likes.remove(&id);
            return Ok(LikeToggle::Unliked);
        }

        t.require_post(post_id)?;
        t.require_user(user_id)?;
        let id = t.next_id();
        t.likes.insert(
            id,
            Like {
                id,
                post: post_id,
                user: user_id,
                is_liked: true,
            },
        );
        Ok(LikeToggle::Liked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
            })
            .await
            .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn post_delete_cascades_to_comments_and_likes() {
        let (store, user) = seeded().await;
        let post = store
            .create_post(NewPost { user: user.id, content: "hello".into(), hashtags: vec![] })
            .await
            .unwrap();
        store.create_comment(post.id, user.id, "first".into()).await.unwrap();
        store.toggle_like(post.id, user.id).await.unwrap();

        assert!(store.delete_post(post.id).await.unwrap());
        assert!(store.list_comments_by_user(user.id).await.unwrap().is_empty());
        assert!(store.list_likes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_like_alternates() {
        let (store, user) = seeded().await;
        let post = store
            .create_post(NewPost { user: user.id, content: "x".into(), hashtags: vec![] })
            .await
            .unwrap();

        assert_eq!(store.toggle_like(post.id, user.id).await.unwrap(), LikeToggle::Liked);
        assert!(store.find_like(post.id, user.id).await.unwrap().unwrap().is_liked);
        assert_eq!(store.toggle_like(post.id, user.id).await.unwrap(), LikeToggle::Unliked);
        assert!(store.find_like(post.id, user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_hashtag_is_rejected() {
        let (store, user) = seeded().await;
        let err = store
            .create_post(NewPost { user: user.id, content: "x".into(), hashtags: vec![999] })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn deleting_hashtag_detaches_it_from_posts() {
        let (store, user) = seeded().await;
        let tag = store.create_hashtag("rust".into()).await.unwrap();
        let post = store
            .create_post(NewPost { user: user.id, content: "x".into(), hashtags: vec![tag.id] })
            .await
            .unwrap();

        assert!(store.delete_hashtag(tag.id).await.unwrap());
        let post = store.get_post(post.id).await.unwrap().unwrap();
        assert!(post.hashtags.is_empty());
    }

    #[tokio::test]
    async fn second_like_for_same_pair_conflicts() {
        let (store, user) = seeded().await;
        let post = store
            .create_post(NewPost { user: user.id, content: "x".into(), hashtags: vec![] })
            .await
            .unwrap();

        store.create_like(post.id, user.id, true).await.unwrap();
        let err = store.create_like(post.id, user.id, false).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_cannot_follow_itself() {
        let (store, user) = seeded().await;
        let (profile, created) = store.get_or_create_profile(user.id, NewProfile::default()).await.unwrap();
        assert!(created);

        let err = store.add_follow(profile.id, profile.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn second_follow_reports_no_insert() {
        let (store, user) = seeded().await;
        let other = store
            .create_user(NewUser { username: "other".into(), email: "other@example.com".into() })
            .await
            .unwrap();
        let (mine, _) = store.get_or_create_profile(user.id, NewProfile::default()).await.unwrap();
        let (theirs, _) = store.get_or_create_profile(other.id, NewProfile::default()).await.unwrap();

        assert!(store.add_follow(mine.id, theirs.id).await.unwrap());
        assert!(!store.add_follow(mine.id, theirs.id).await.unwrap());
        let mine = store.get_profile(mine.id).await.unwrap().unwrap();
        assert_eq!(mine.follow_profiles, vec![theirs.id]);
    }
}
