mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn registration_returns_a_usable_token() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .post(
            "/api/register/",
            None,
            json!({ "email": "Joana@IASD.local", "password": "StrongPass123!", "name": "Joana" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let user_id = body["user"]["id"].as_i64().expect("user id");
    let token = body["token"].as_str().expect("token").to_string();
    assert_eq!(token.len(), 40);

    let res = server.get("/api/auth/me/", Some(&token)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await?;
    assert_eq!(me["id"], user_id);
    assert_eq!(me["email"], "joana@iasd.local");
    assert!(me["profile_id"].as_i64().is_some());
    assert_eq!(me["is_admin"], false);
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_rejected() -> Result<()> {
    let server = TestServer::start().await?;
    let first = json!({ "email": "pedro@iasd.local", "password": "StrongPass123!" });
    assert_eq!(server.post("/api/register/", None, first).await?.status(), StatusCode::CREATED);

    let again = json!({ "username": "PEDRO@iasd.local", "email": "outro@iasd.local", "password": "Other123!" });
    let res = server.post("/api/register/", None, again).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], true);

    // The rejected password never became valid for anyone
    let res = server
        .post("/api/login/", None, json!({ "username": "outro@iasd.local", "password": "Other123!" }))
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn unknown_tokens_and_logged_out_tokens_are_refused() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("/api/auth/me/", Some("0000000000000000000000000000000000000000")).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let token = server.login("membro@iasd.local", "Member123!").await?;
    assert_eq!(server.get("/api/auth/me/", Some(&token)).await?.status(), StatusCode::OK);

    let res = server.post("/api/logout/", Some(&token), json!({})).await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(server.get("/api/auth/me/", Some(&token)).await?.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn bearer_scheme_is_accepted() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("elder@iasd.local", "Elder123!").await?;

    let res = server
        .client
        .get(server.url("/api/auth/me/"))
        .header("Authorization", format!("Bearer {token}"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await?;
    assert_eq!(me["is_elder"], true);
    Ok(())
}
