use axum::{
    extract::State,
    http::Method,
    Extension,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::database::models::profile::search_terms;
use crate::database::models::{NewProfile, Profile, ProfileChanges};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, Requester};
use crate::permissions::check_object_permission;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileListQuery {
    pub search: Option<String>,
}

/// Profile fields as sent by clients. A field that is absent stays `None`;
/// an explicit `null` becomes `Some(None)`.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePayload {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, alias = "follow")]
    pub follow_profiles: Option<Vec<i64>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ProfilePayload {
    fn into_new(self) -> NewProfile {
        NewProfile {
            first_name: self.first_name.flatten(),
            last_name: self.last_name.flatten(),
            bio: self.bio.flatten(),
            email: self.email.flatten(),
            follow_profiles: self.follow_profiles.unwrap_or_default(),
        }
    }

    /// PUT semantics: every omitted field is cleared
    fn into_replacement(self) -> ProfileChanges {
        ProfileChanges {
            first_name: Some(self.first_name.flatten()),
            last_name: Some(self.last_name.flatten()),
            bio: Some(self.bio.flatten()),
            email: Some(self.email.flatten()),
            follow_profiles: Some(self.follow_profiles.unwrap_or_default()),
        }
    }

    fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            first_name: self.first_name,
            last_name: self.last_name,
            bio: self.bio,
            email: self.email,
            follow_profiles: self.follow_profiles,
        }
    }
}

async fn load(state: &AppState, id: i64) -> Result<Profile, ApiError> {
    state
        .store
        .get_profile(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Profile {} not found", id)))
}

/// The requester's own profile, created empty on first use
async fn acting_profile(state: &AppState, user_id: i64) -> Result<Profile, ApiError> {
    let (profile, created) = state.store.get_or_create_profile(user_id, NewProfile::default()).await?;
    if created {
        tracing::debug!(profile_id = profile.id, user_id, "profile created on demand");
    }
    Ok(profile)
}

/// GET /api/profiles[?search=terms]
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<ProfileListQuery>) -> ApiResult<Vec<Profile>> {
    let terms = query.search.as_deref().map(search_terms).unwrap_or_default();
    Ok(ApiResponse::Success(state.store.list_profiles(&terms).await?))
}

/// POST /api/profiles - get-or-create for the requester
pub async fn create(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<Profile> {
    let user = requester.require_user()?;
    let (profile, created) = state.store.get_or_create_profile(user.user_id, payload.into_new()).await?;

    if created {
        tracing::info!(profile_id = profile.id, user_id = user.user_id, "profile created");
    } else {
        tracing::debug!(profile_id = profile.id, "profile already exists, payload ignored");
    }
    Ok(ApiResponse::Created(profile))
}

/// GET /api/profiles/:id
pub async fn retrieve(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Profile> {
    Ok(ApiResponse::Success(load(&state, id).await?))
}

/// PUT /api/profiles/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<Profile> {
    let profile = load(&state, id).await?;
    check_object_permission(&requester, &profile, &method)?;
    apply(&state, id, payload.into_replacement()).await
}

/// PATCH /api/profiles/:id
pub async fn partial_update(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    method: Method,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ProfilePayload>,
) -> ApiResult<Profile> {
    let profile = load(&state, id).await?;
    check_object_permission(&requester, &profile, &method)?;
    apply(&state, id, payload.into_changes()).await
}

async fn apply(state: &AppState, id: i64, changes: ProfileChanges) -> ApiResult<Profile> {
    let profile = state
        .store
        .update_profile(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Profile {} not found", id)))?;
    Ok(ApiResponse::Success(profile))
}

/// POST /api/profiles/:id/follow - `id` is the profile to follow
pub async fn follow(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<&'static str> {
    let user = requester.require_user()?;
    let target = load(&state, id).await?;
    let acting = acting_profile(&state, user.user_id).await?;

    if acting.id == target.id {
        return Err(ApiError::bad_request("You cannot follow yourself."));
    }
    // The insert result decides, so concurrent follows cannot both succeed
    if !state.store.add_follow(acting.id, target.id).await? {
        return Err(ApiError::bad_request("You are already following this profile."));
    }
    tracing::info!(profile_id = acting.id, target_id = target.id, "profile followed");
    Ok(ApiResponse::Success("Profile was followed successfully."))
}

/// POST /api/profiles/:id/unfollow - succeeds whether or not `id` was followed
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Value> {
    let user = requester.require_user()?;
    let target = load(&state, id).await?;
    let acting = acting_profile(&state, user.user_id).await?;

    if state.store.remove_follow(acting.id, target.id).await? {
        tracing::info!(profile_id = acting.id, target_id = target.id, "profile unfollowed");
    }
    Ok(ApiResponse::Success(json!({
        "detail": "You have successfully unsubscribed from this profile."
    })))
}
