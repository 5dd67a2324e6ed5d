use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Who is making the request. Reads are open, so a missing token is not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requester {
    Anonymous,
    User(AuthUser),
}

impl Requester {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Requester::Anonymous => None,
            Requester::User(user) => Some(user.user_id),
        }
    }

    /// The authenticated user, or 401 for anonymous callers
    pub fn require_user(&self) -> Result<&AuthUser, ApiError> {
        match self {
            Requester::User(user) => Ok(user),
            Requester::Anonymous => Err(ApiError::unauthorized("Authentication credentials were not provided.")),
        }
    }
}

/// JWT authentication middleware.
///
/// No `Authorization` header yields `Requester::Anonymous`; a header that is
/// present but malformed or carries an invalid token is rejected with 401.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let requester = match extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)? {
        None => Requester::Anonymous,
        Some(token) => {
            let claims = state.jwt.verify(&token).map_err(|e| {
                tracing::debug!("rejected bearer token: {}", e);
                ApiError::from(e)
            })?;
            Requester::User(AuthUser { user_id: claims.user_id })
        }
    };

    request.extensions_mut().insert(requester);
    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(Some(token.trim().to_string()))
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc.def")), Ok(Some("abc.def".to_string())));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_errors() {
        assert!(extract_jwt_from_headers(&headers("Basic dXNlcjpwYXNz")).is_err());
        assert!(extract_jwt_from_headers(&headers("Bearer   ")).is_err());
    }

    #[test]
    fn anonymous_requester_needs_credentials() {
        let err = Requester::Anonymous.require_user().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(Requester::User(AuthUser { user_id: 3 }).user_id(), Some(3));
    }
}
