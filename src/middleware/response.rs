use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// Successful handler outcome. Bodies are wrapped as `{"success": true, "data": ...}`.
#[derive(Debug)]
pub enum ApiResponse<T> {
    /// 200 with envelope
    Success(T),
    /// 201 with envelope
    Created(T),
    /// 204, no body
    NoContent,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let (status, data) = match self {
            ApiResponse::Success(data) => (StatusCode::OK, data),
            ApiResponse::Created(data) => (StatusCode::CREATED, data),
            ApiResponse::NoContent => return StatusCode::NO_CONTENT.into_response(),
        };
        (status, Json(Envelope { success: true, data })).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn created_wraps_data_with_201() {
        let response = ApiResponse::Created(vec![1, 2]).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[tokio::test]
    async fn no_content_has_empty_body() {
        let response = ApiResponse::<()>::NoContent.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
