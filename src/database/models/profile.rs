use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    /// Ids of the profiles this profile follows, ascending
    pub follow_profiles: Vec<i64>,
}

impl Profile {
    pub fn follows(&self, profile_id: i64) -> bool {
        self.follow_profiles.contains(&profile_id)
    }

    /// Case-insensitive search over the owner's username and the profile email.
    /// Every term has to hit at least one of the two fields.
    pub fn matches_search(&self, terms: &[String]) -> bool {
        let username = self.username.to_lowercase();
        let email = self.email.as_deref().unwrap_or_default().to_lowercase();
        terms.iter().all(|term| {
            let term = term.to_lowercase();
            username.contains(&term) || email.contains(&term)
        })
    }
}

/// Splits a `?search=` value into terms the way list filters expect
pub fn search_terms(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub email: Option<String>,
    pub follow_profiles: Vec<i64>,
}

/// Partial update. The outer `Option` says whether the field was supplied.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub follow_profiles: Option<Vec<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str, email: Option<&str>) -> Profile {
        Profile {
            id: 1,
            user: 1,
            username: username.to_string(),
            first_name: None,
            last_name: None,
            bio: None,
            email: email.map(str::to_string),
            follow_profiles: vec![],
        }
    }

    #[test]
    fn search_terms_split_on_whitespace_and_commas() {
        assert_eq!(search_terms(" alice, bob  carol"), vec!["alice", "bob", "carol"]);
        assert!(search_terms("  ,, ").is_empty());
    }

    #[test]
    fn search_matches_username_or_email() {
        let p = profile("Alice", Some("alice@Example.com"));
        assert!(p.matches_search(&search_terms("ali")));
        assert!(p.matches_search(&search_terms("example")));
        assert!(p.matches_search(&search_terms("alice example")));
        assert!(!p.matches_search(&search_terms("alice bob")));
    }

    #[test]
    fn search_without_email_only_checks_username() {
        let p = profile("bob", None);
        assert!(p.matches_search(&search_terms("BO")));
        assert!(!p.matches_search(&search_terms("example")));
    }
}
