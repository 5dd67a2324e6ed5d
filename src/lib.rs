use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod permissions;
pub mod state;

use crate::auth::JwtKeys;
use crate::config::{AppConfig, SecurityConfig, StorageBackend};
use crate::database::{DatabaseManager, MemoryStore, PgStore, SocialStore};
use crate::media::LocalMediaStore;
use crate::state::AppState;

/// Wire the configured store, media backend and signing keys together
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn SocialStore> = match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            Arc::new(PgStore::new(pool))
        }
    };

    let media = Arc::new(LocalMediaStore::new(config.media.root.clone(), config.media.url_prefix.clone()));
    let jwt = JwtKeys::from_config(&config.security)?;

    Ok(AppState::new(store, media, jwt))
}

/// Build state from `config`, bind and serve until the process is stopped
pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    config.validate()?;

    let state = build_state(config).await?;
    let router = app(state, config);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Social API listening on http://{}", bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}

/// The full HTTP application
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(hashtag_routes())
        .merge(post_routes())
        .merge(profile_routes())
        .merge(comment_routes())
        .merge(like_routes())
        .layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .with_state(state);

    if config.media.url_prefix.starts_with('/') && config.media.url_prefix.len() > 1 {
        router = router.nest_service(&config.media.url_prefix, ServeDir::new(&config.media.root));
    }

    router
        // Global middleware
        .layer(DefaultBodyLimit::max(config.media.max_upload_bytes))
        .layer(cors_layer(&config.security))
        .layer(TraceLayer::new_for_http())
}

fn hashtag_routes() -> Router<AppState> {
    use handlers::hashtags;

    Router::new()
        .route("/hashtags", get(hashtags::list).post(hashtags::create))
        .route(
            "/hashtags/:id",
            get(hashtags::retrieve)
                .put(hashtags::update)
                .patch(hashtags::partial_update)
                .delete(hashtags::destroy),
        )
}

fn post_routes() -> Router<AppState> {
    use handlers::posts;

    Router::new()
        .route("/posts", get(posts::list).post(posts::create))
        .route(
            "/posts/:id",
            get(posts::retrieve)
                .put(posts::update)
                .patch(posts::partial_update)
                .delete(posts::destroy),
        )
        // Post actions
        .route("/posts/:id/upload-image", post(posts::upload_image))
        .route("/posts/:id/like", post(posts::like))
        .route("/posts/:id/add_comment", post(posts::add_comment))
}

fn profile_routes() -> Router<AppState> {
    use handlers::profiles;

    Router::new()
        .route("/profiles", get(profiles::list).post(profiles::create))
        .route(
            "/profiles/:id",
            get(profiles::retrieve)
                .put(profiles::update)
                .patch(profiles::partial_update),
        )
        .route("/profiles/:id/follow", post(profiles::follow))
        .route("/profiles/:id/unfollow", post(profiles::unfollow))
}

fn comment_routes() -> Router<AppState> {
    use handlers::comments;

    Router::new()
        .route("/comments", get(comments::list).post(comments::create))
        .route(
            "/comments/:id",
            get(comments::retrieve)
                .put(comments::update)
                .patch(comments::partial_update)
                .delete(comments::destroy),
        )
}

fn like_routes() -> Router<AppState> {
    use handlers::likes;

    Router::new()
        .route("/likes", get(likes::list).post(likes::create))
        .route(
            "/likes/:id",
            get(likes::retrieve)
                .put(likes::update)
                .patch(likes::partial_update)
                .delete(likes::destroy),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Social API",
            "version": version,
            "description": "Social networking REST API built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "hashtags": "/api/hashtags[/:id] (read public, write authenticated)",
                "posts": "/api/posts[/:id][/upload-image|/like|/add_comment] (read public, write author)",
                "profiles": "/api/profiles[/:id][/follow|/unfollow] (read public, write owner)",
                "comments": "/api/comments[/:id] (list own, write author)",
                "likes": "/api/likes[/:id] (read public, write author)",
                "media": "/media/* (public)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
