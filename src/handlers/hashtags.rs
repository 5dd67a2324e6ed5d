use axum::{
    extract::State,
    Extension,
};
use serde::Deserialize;

use crate::database::models::Hashtag;
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiResponse, ApiResult, Requester};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HashtagPayload {
    pub name: Option<String>,
}

fn required_name(name: Option<String>) -> Result<String, ApiError> {
    match name {
        None => Err(ApiError::field_error("name", "This field is required.")),
        Some(n) if n.trim().is_empty() => Err(ApiError::field_error("name", "This field may not be blank.")),
        Some(n) => Ok(n),
    }
}

async fn load(state: &AppState, id: i64) -> Result<Hashtag, ApiError> {
    state
        .store
        .get_hashtag(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Hashtag {} not found", id)))
}

/// GET /api/hashtags
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Hashtag>> {
    Ok(ApiResponse::Success(state.store.list_hashtags().await?))
}

/// POST /api/hashtags
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(payload): ApiJson<HashtagPayload>,
) -> ApiResult<Hashtag> {
    requester.require_user()?;
    let name = required_name(payload.name)?;
    let hashtag = state.store.create_hashtag(name).await?;
    tracing::info!(hashtag_id = hashtag.id, "hashtag created");
    Ok(ApiResponse::Created(hashtag))
}

/// GET /api/hashtags/:id
pub async fn retrieve(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Hashtag> {
    Ok(ApiResponse::Success(load(&state, id).await?))
}

/// PUT /api/hashtags/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<HashtagPayload>,
) -> ApiResult<Hashtag> {
    requester.require_user()?;
    load(&state, id).await?;
    let name = required_name(payload.name)?;
    rename(&state, id, name).await
}

/// PATCH /api/hashtags/:id
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<HashtagPayload>,
) -> ApiResult<Hashtag> {
    requester.require_user()?;
    let current = load(&state, id).await?;
    match payload.name {
        None => Ok(ApiResponse::Success(current)),
        name => rename(&state, id, required_name(name)?).await,
    }
}

async fn rename(state: &AppState, id: i64, name: String) -> ApiResult<Hashtag> {
    let hashtag = state
        .store
        .update_hashtag(id, name)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Hashtag {} not found", id)))?;
    Ok(ApiResponse::Success(hashtag))
}

/// DELETE /api/hashtags/:id
pub async fn destroy(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    requester.require_user()?;
    if !state.store.delete_hashtag(id).await? {
        return Err(ApiError::not_found(format!("Hashtag {} not found", id)));
    }
    tracing::info!(hashtag_id = id, "hashtag deleted");
    Ok(ApiResponse::NoContent)
}
