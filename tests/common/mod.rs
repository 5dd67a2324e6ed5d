#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use social_api::auth::JwtKeys;
use social_api::config::AppConfig;
use social_api::database::models::NewUser;
use social_api::database::{MemoryStore, SocialStore};
use social_api::media::LocalMediaStore;
use social_api::state::AppState;

pub const MULTIPART_BOUNDARY: &str = "social-test-boundary";

/// The real router over an in-memory store and a throwaway media directory
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jwt: JwtKeys,
    pub media_dir: TempDir,
}

pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let media_dir = tempfile::tempdir()?;

        let mut config = AppConfig::development();
        config.media.root = media_dir.path().to_path_buf();

        let store = Arc::new(MemoryStore::new());
        let jwt = JwtKeys::new("integration-test-secret", 1)?;
        let media = Arc::new(LocalMediaStore::new(config.media.root.clone(), config.media.url_prefix.clone()));
        let state = AppState::new(store.clone(), media, jwt.clone());

        Ok(Self {
            router: social_api::app(state, &config),
            store,
            jwt,
            media_dir,
        })
    }

    pub async fn user(&self, username: &str) -> Result<TestUser> {
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
            })
            .await?;
        Ok(TestUser {
            id: user.id,
            token: self.jwt.issue(user.id)?,
        })
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, body))
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    /// `POST` a single file field as multipart/form-data
    pub async fn upload(&self, uri: &str, token: &str, field: &str, filename: &str, data: &[u8]) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(field, filename, data)))?;
        self.send(request).await
    }

    /// Create a post and return its id
    pub async fn create_post(&self, author: &TestUser, content: &str, hashtags: &[i64]) -> Result<i64> {
        let (status, body) = self
            .post("/api/posts", &author.token, serde_json::json!({ "content": content, "hashtags": hashtags }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "post create failed: {} {}", status, body);
        Ok(id_of(&body))
    }

    pub async fn create_hashtag(&self, author: &TestUser, name: &str) -> Result<i64> {
        let (status, body) = self
            .post("/api/hashtags", &author.token, serde_json::json!({ "name": name }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "hashtag create failed: {} {}", status, body);
        Ok(id_of(&body))
    }
}

pub fn id_of(body: &Value) -> i64 {
    body["data"]["id"].as_i64().unwrap_or_default()
}

pub fn ids_of(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}

pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .unwrap_or_else(|e| panic!("failed to encode test png: {e}"));
    out.into_inner()
}
