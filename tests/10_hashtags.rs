mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn hashtag_crud() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;

    let id = app.create_hashtag(&alice, "rust").await?;

    let (status, body) = app.get("/api/hashtags", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(common::ids_of(&body), vec![id]);

    let (status, body) = app
        .request(Method::PATCH, &format!("/api/hashtags/{id}"), Some(&alice.token), Some(json!({"name": "rustlang"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "rustlang");

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/hashtags/{id}"), Some(&alice.token), None)
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get(&format!("/api/hashtags/{id}"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn hashtag_name_is_required() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;

    let (status, body) = app.post("/api/hashtags", &alice.token, json!({"name": ""})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["name"].is_string());

    let id = app.create_hashtag(&alice, "tokio").await?;
    let (status, _) = app
        .request(Method::PUT, &format!("/api/hashtags/{id}"), Some(&alice.token), Some(json!({})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn any_authenticated_user_may_edit_hashtags() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;

    let id = app.create_hashtag(&alice, "axum").await?;
    let (status, body) = app
        .request(Method::PUT, &format!("/api/hashtags/{id}"), Some(&bob.token), Some(json!({"name": "tower"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "tower");
    Ok(())
}
