mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn one_like_per_post_and_user() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;
    let post = app.create_post(&alice, "popular", &[]).await?;

    let (status, body) = app.post("/api/likes", &bob.token, json!({"post": post})).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"], bob.id);
    assert_eq!(body["data"]["is_liked"], true);

    let (status, body) = app
        .post("/api/likes", &bob.token, json!({"post": post, "is_liked": false}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app.post("/api/likes", &alice.token, json!({"post": post})).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/api/likes", None).await?;
    assert_eq!(common::ids_of(&body).len(), 2);
    Ok(())
}

#[tokio::test]
async fn only_the_author_may_update_or_delete() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;
    let post = app.create_post(&alice, "popular", &[]).await?;

    let (_, body) = app.post("/api/likes", &bob.token, json!({"post": post})).await?;
    let uri = format!("/api/likes/{}", common::id_of(&body));

    let (status, _) = app
        .request(Method::PATCH, &uri, Some(&alice.token), Some(json!({"is_liked": false})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&alice.token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app.get(&uri, None).await?;
    assert_eq!(body["data"]["is_liked"], true);

    let (status, body) = app
        .request(Method::PUT, &uri, Some(&bob.token), Some(json!({"is_liked": false})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_liked"], false);

    let (status, _) = app.request(Method::DELETE, &uri, Some(&bob.token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = app.get("/api/likes", None).await?;
    assert_eq!(body["data"], json!([]));
    Ok(())
}
