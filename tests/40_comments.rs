mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn listing_is_scoped_to_the_requester() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;
    let post = app.create_post(&alice, "thread", &[]).await?;

    let (status, mine) = app
        .post("/api/comments", &alice.token, json!({"post": post, "content": "from alice"}))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(mine["data"]["user"], alice.id);
    let (_, theirs) = app
        .post("/api/comments", &bob.token, json!({"post": post, "content": "from bob"}))
        .await?;

    let (_, body) = app.get("/api/comments", Some(&alice.token)).await?;
    assert_eq!(common::ids_of(&body), vec![common::id_of(&mine)]);

    let (_, body) = app.get("/api/comments", Some(&bob.token)).await?;
    assert_eq!(common::ids_of(&body), vec![common::id_of(&theirs)]);

    let (status, body) = app.get("/api/comments", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;
    let post = app.create_post(&alice, "thread", &[]).await?;

    let (_, body) = app
        .post("/api/comments", &alice.token, json!({"post": post, "content": "original"}))
        .await?;
    let uri = format!("/api/comments/{}", common::id_of(&body));

    let (status, _) = app
        .request(Method::PUT, &uri, Some(&bob.token), Some(json!({"content": "edited by bob"})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &uri, Some(&bob.token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&uri, Some(&alice.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "original");

    let (status, body) = app
        .request(Method::PATCH, &uri, Some(&alice.token), Some(json!({"content": "edited"})))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "edited");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&alice.token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&uri, Some(&alice.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn other_users_comments_read_as_missing() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;
    let bob = app.user("bob").await?;
    let post = app.create_post(&alice, "thread", &[]).await?;

    let (_, body) = app
        .post("/api/comments", &alice.token, json!({"post": post, "content": "private-ish"}))
        .await?;
    let uri = format!("/api/comments/{}", common::id_of(&body));

    let (status, body) = app.get(&uri, Some(&bob.token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert!(body.get("data").is_none());

    let (status, _) = app.get(&uri, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get(&uri, Some(&alice.token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "private-ish");
    Ok(())
}

#[tokio::test]
async fn comment_on_missing_post_is_rejected() -> Result<()> {
    let app = common::TestApp::new()?;
    let alice = app.user("alice").await?;

    let (status, body) = app
        .post("/api/comments", &alice.token, json!({"post": 999999, "content": "orphan"}))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app.post("/api/comments", &alice.token, json!({"content": "no post"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["post"].is_string());
    Ok(())
}
