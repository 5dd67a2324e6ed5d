//! Author-or-read-only object permission shared by every owned resource.

use axum::http::Method;

use crate::database::models::{Comment, Like, Post, Profile};
use crate::error::ApiError;
use crate::middleware::Requester;

/// Resources that carry the id of the user who owns them
pub trait Authored {
    fn author_id(&self) -> i64;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.user
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.user
    }
}

impl Authored for Like {
    fn author_id(&self) -> i64 {
        self.user
    }
}

impl Authored for Profile {
    fn author_id(&self) -> i64 {
        self.user
    }
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Safe methods always pass. Anything else needs a requester who authored `object`.
pub fn check_object_permission(requester: &Requester, object: &impl Authored, method: &Method) -> Result<(), ApiError> {
    if is_safe_method(method) {
        return Ok(());
    }

    let user = requester.require_user()?;
    if user.user_id != object.author_id() {
        tracing::debug!(
            user_id = user.user_id,
            author_id = object.author_id(),
            %method,
            "write denied to non-author"
        );
        return Err(ApiError::forbidden("You do not have permission to perform this action."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::AuthUser;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn comment_by(user: i64) -> Comment {
        Comment {
            id: 1,
            post: 1,
            user,
            content: "hi".into(),
            created_at: Utc::now(),
        }
    }

    fn user(id: i64) -> Requester {
        Requester::User(AuthUser { user_id: id })
    }

    #[test]
    fn safe_methods_are_open_to_anyone() {
        let comment = comment_by(1);
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(check_object_permission(&Requester::Anonymous, &comment, &method).is_ok());
            assert!(check_object_permission(&user(2), &comment, &method).is_ok());
        }
    }

    #[test]
    fn author_may_write() {
        let comment = comment_by(1);
        for method in [Method::PUT, Method::PATCH, Method::DELETE, Method::POST] {
            assert!(check_object_permission(&user(1), &comment, &method).is_ok());
        }
    }

    #[test]
    fn other_users_are_forbidden_and_anonymous_unauthorized() {
        let comment = comment_by(1);
        let err = check_object_permission(&user(2), &comment, &Method::DELETE).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = check_object_permission(&Requester::Anonymous, &comment, &Method::PATCH).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
