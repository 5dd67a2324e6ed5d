//! Postgres implementation of `SocialStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use crate::database::models::{
    Comment, Hashtag, Like, LikeToggle, NewPost, NewProfile, NewUser, Post, PostChanges, Profile,
    ProfileChanges, User,
};
use crate::database::store::{SocialStore, StoreError, StoreResult};

const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id AS "user", p.content, p.image, p.created_at,
           COALESCE(
               array_agg(ph.hashtag_id ORDER BY ph.hashtag_id) FILTER (WHERE ph.hashtag_id IS NOT NULL),
               '{}'
           ) AS hashtags
    FROM posts p
    LEFT JOIN post_hashtags ph ON ph.post_id = p.id
"#;

const PROFILE_SELECT: &str = r#"
    SELECT pr.id, pr.user_id AS "user", u.username,
           pr.first_name, pr.last_name, pr.bio, pr.email,
           COALESCE(
               array_agg(pf.followed_id ORDER BY pf.followed_id) FILTER (WHERE pf.followed_id IS NOT NULL),
               '{}'
           ) AS follow_profiles
    FROM profiles pr
    JOIN users u ON u.id = pr.user_id
    LEFT JOIN profile_follows pf ON pf.profile_id = pr.id
"#;

const COMMENT_SELECT: &str =
    r#"SELECT id, post_id AS post, user_id AS "user", content, created_at FROM comments"#;

const LIKE_SELECT: &str = r#"SELECT id, post_id AS post, user_id AS "user", is_liked FROM likes"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_post_hashtags(
        tx: &mut Transaction<'_, Postgres>,
        post_id: i64,
        hashtags: &[i64],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM post_hashtags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;

        if !hashtags.is_empty() {
            sqlx::query(
                "INSERT INTO post_hashtags (post_id, hashtag_id)
                 SELECT $1, UNNEST($2::BIGINT[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(hashtags)
            .execute(&mut **tx)
            .await
            .map_err(|e| classify(e, "hashtag does not exist"))?;
        }
        Ok(())
    }

    async fn replace_follows(
        tx: &mut Transaction<'_, Postgres>,
        profile_id: i64,
        follows: &[i64],
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM profile_follows WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&mut **tx)
            .await?;

        if !follows.is_empty() {
            sqlx::query(
                "INSERT INTO profile_follows (profile_id, followed_id)
                 SELECT $1, UNNEST($2::BIGINT[])
                 ON CONFLICT DO NOTHING",
            )
            .bind(profile_id)
            .bind(follows)
            .execute(&mut **tx)
            .await
            .map_err(|e| classify(e, "followed profile does not exist or is the profile itself"))?;
        }
        Ok(())
    }
}

/// Translate constraint violations into store-level errors
fn classify(err: sqlx::Error, reference: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_foreign_key_violation() || db.is_check_violation() {
            return StoreError::InvalidReference(reference.to_string());
        }
        if db.is_unique_violation() {
            return StoreError::Conflict(db.message().to_string());
        }
    }
    StoreError::Sqlx(err)
}

#[async_trait]
impl SocialStore for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email) VALUES ($1, $2)
             RETURNING id, username, email, created_at",
        )
        .bind(&user.username)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "user"))
    }

    async fn list_hashtags(&self) -> StoreResult<Vec<Hashtag>> {
        let rows = sqlx::query_as::<_, Hashtag>("SELECT id, name FROM hashtags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_hashtag(&self, id: i64) -> StoreResult<Option<Hashtag>> {
        let row = sqlx::query_as::<_, Hashtag>("SELECT id, name FROM hashtags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_hashtag(&self, name: String) -> StoreResult<Hashtag> {
        let row = sqlx::query_as::<_, Hashtag>("INSERT INTO hashtags (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn update_hashtag(&self, id: i64, name: String) -> StoreResult<Option<Hashtag>> {
        let row = sqlx::query_as::<_, Hashtag>("UPDATE hashtags SET name = $2 WHERE id = $1 RETURNING id, name")
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_hashtag(&self, id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM hashtags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_posts(&self, hashtags: Option<&[i64]>) -> StoreResult<Vec<Post>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        if let Some(ids) = hashtags {
            qb.push(
                " WHERE EXISTS (SELECT 1 FROM post_hashtags f WHERE f.post_id = p.id AND f.hashtag_id = ANY(",
            );
            qb.push_bind(ids.to_vec());
            qb.push("))");
        }
        qb.push(" GROUP BY p.id ORDER BY p.id");

        let rows = qb.build_query_as::<Post>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get_post(&self, id: i64) -> StoreResult<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1 GROUP BY p.id");
        let row = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar("INSERT INTO posts (user_id, content) VALUES ($1, $2) RETURNING id")
            .bind(post.user)
            .bind(&post.content)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| classify(e, "user does not exist"))?;

        Self::replace_post_hashtags(&mut tx, id, &post.hashtags).await?;
        tx.commit().await?;

        self.get_post(id)
            .await?
            .ok_or_else(|| StoreError::Sqlx(sqlx::Error::RowNotFound))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> StoreResult<Option<Post>> {
        let mut tx = self.pool.begin().await?;

        let found: Option<i64> = sqlx::query_scalar(
            "UPDATE posts SET content = COALESCE($2, content) WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(changes.content)
        .fetch_optional(&mut *tx)
        .await?;

        if found.is_none() {
            return Ok(None);
        }
        if let Some(hashtags) = changes.hashtags {
            Self::replace_post_hashtags(&mut tx, id, &hashtags).await?;
        }
        tx.commit().await?;

        self.get_post(id).await
    }

    async fn set_post_image(&self, id: i64, image: String) -> StoreResult<Option<Post>> {
        let affected = sqlx::query("UPDATE posts SET image = $2 WHERE id = $1")
            .bind(id)
            .bind(image)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if affected == 0 {
            return Ok(None);
        }
        self.get_post(id).await
    }

    async fn delete_post(&self, id: i64) -> StoreResult<bool> {
        // comments, likes and post_hashtags go with it (ON DELETE CASCADE)
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_profiles(&self, search: &[String]) -> StoreResult<Vec<Profile>> {
        let mut qb = QueryBuilder::<Postgres>::new(PROFILE_SELECT);
        for (i, term) in search.iter().enumerate() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(if i == 0 { " WHERE (" } else { " AND (" });
            qb.push("u.username ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR COALESCE(pr.email, '') ILIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        qb.push(" GROUP BY pr.id, u.username ORDER BY pr.id");

        let rows = qb.build_query_as::<Profile>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get_profile(&self, id: i64) -> StoreResult<Option<Profile>> {
        let sql = format!("{PROFILE_SELECT} WHERE pr.id = $1 GROUP BY pr.id, u.username");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_profile_by_user(&self, user_id: i64) -> StoreResult<Option<Profile>> {
        let sql = format!("{PROFILE_SELECT} WHERE pr.user_id = $1 GROUP BY pr.id, u.username");
        let row = sqlx::query_as::<_, Profile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_or_create_profile(&self, user_id: i64, profile: NewProfile) -> StoreResult<(Profile, bool)> {
        let mut tx = self.pool.begin().await?;

        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO profiles (user_id, first_name, last_name, bio, email)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (user_id) DO NOTHING
             RETURNING id",
        )
        .bind(user_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.bio)
        .bind(&profile.email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify(e, "user does not exist"))?;

        let created = match inserted {
            Some(id) => {
                Self::replace_follows(&mut tx, id, &profile.follow_profiles).await?;
                true
            }
            None => false,
        };
        tx.commit().await?;

        let row = self
            .get_profile_by_user(user_id)
            .await?
            .ok_or_else(|| StoreError::Sqlx(sqlx::Error::RowNotFound))?;
        Ok((row, created))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> StoreResult<Option<Profile>> {
        let mut tx = self.pool.begin().await?;

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE profiles SET id = id");
        for (column, value) in [
            ("first_name", changes.first_name),
            ("last_name", changes.last_name),
            ("bio", changes.bio),
            ("email", changes.email),
        ] {
            if let Some(value) = value {
                qb.push(format!(", {column} = "));
                qb.push_bind(value);
            }
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING id");

        let found: Option<i64> = qb.build_query_scalar::<i64>().fetch_optional(&mut *tx).await?;
        if found.is_none() {
            return Ok(None);
        }
        if let Some(follows) = changes.follow_profiles {
            Self::replace_follows(&mut tx, id, &follows).await?;
        }
        tx.commit().await?;

        self.get_profile(id).await
    }

    async fn add_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool> {
        let affected = sqlx::query(
            "INSERT INTO profile_follows (profile_id, followed_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(profile_id)
        .bind(target_id)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "followed profile does not exist or is the profile itself"))?
        .rows_affected();
        Ok(affected > 0)
    }

    async fn remove_follow(&self, profile_id: i64, target_id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM profile_follows WHERE profile_id = $1 AND followed_id = $2")
            .bind(profile_id)
            .bind(target_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_comments_by_user(&self, user_id: i64) -> StoreResult<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE user_id = $1 ORDER BY id");
        let rows = sqlx::query_as::<_, Comment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_comment(&self, id: i64) -> StoreResult<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_comment(&self, post_id: i64, user_id: i64, content: String) -> StoreResult<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"INSERT INTO comments (post_id, user_id, content) VALUES ($1, $2, $3)
               RETURNING id, post_id AS post, user_id AS "user", content, created_at"#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "post or user does not exist"))
    }

    async fn update_comment(&self, id: i64, content: String) -> StoreResult<Option<Comment>> {
        let row = sqlx::query_as::<_, Comment>(
            r#"UPDATE comments SET content = $2 WHERE id = $1
               RETURNING id, post_id AS post, user_id AS "user", content, created_at"#,
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_comment(&self, id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn list_likes(&self) -> StoreResult<Vec<Like>> {
        let sql = format!("{LIKE_SELECT} ORDER BY id");
        let rows = sqlx::query_as::<_, Like>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn get_like(&self, id: i64) -> StoreResult<Option<Like>> {
        let sql = format!("{LIKE_SELECT} WHERE id = $1");
        let row = sqlx::query_as::<_, Like>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn find_like(&self, post_id: i64, user_id: i64) -> StoreResult<Option<Like>> {
        let sql = format!("{LIKE_SELECT} WHERE post_id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, Like>(&sql)
            .bind(post_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn create_like(&self, post_id: i64, user_id: i64, is_liked: bool) -> StoreResult<Like> {
        sqlx::query_as::<_, Like>(
            r#"INSERT INTO likes (post_id, user_id, is_liked) VALUES ($1, $2, $3)
               RETURNING id, post_id AS post, user_id AS "user", is_liked"#,
        )
        .bind(post_id)
        .bind(user_id)
        .bind(is_liked)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "post or user does not exist"))
    }

    async fn update_like(&self, id: i64, is_liked: bool) -> StoreResult<Option<Like>> {
        let row = sqlx::query_as::<_, Like>(
            r#"UPDATE likes SET is_liked = $2 WHERE id = $1
               RETURNING id, post_id AS post, user_id AS "user", is_liked"#,
        )
        .bind(id)
        .bind(is_liked)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_like(&self, id: i64) -> StoreResult<bool> {
        let affected = sqlx::query("DELETE FROM likes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn toggle_like(&self, post_id: i64, user_id: i64) -> StoreResult<LikeToggle> {
        let mut tx = self.pool.begin().await?;

        let removed: Option<i64> =
            sqlx::query_scalar("DELETE FROM likes WHERE post_id = $1 AND user_id = $2 RETURNING id")
                .bind(post_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let outcome = if removed.is_some() {
            LikeToggle::Unliked
        } else {
            sqlx::query(
                "INSERT INTO likes (post_id, user_id, is_liked) VALUES ($1, $2, TRUE)
                 ON CONFLICT (post_id, user_id) DO NOTHING",
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| classify(e, "post or user does not exist"))?;
            LikeToggle::Liked
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

/// Escape LIKE wildcards so search terms match literally
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }
}
