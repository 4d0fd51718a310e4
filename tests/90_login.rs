mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn login_with_registered_credentials() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .post(
            "/api/register/",
            None,
            json!({ "email": "user@iasd.local", "password": "StrongPass123!" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = server
        .post(
            "/api/login/",
            None,
            json!({ "username": "user@iasd.local", "password": "StrongPass123!" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()), "missing token: {}", body);
    assert_eq!(body["user"]["username"], "user@iasd.local");
    Ok(())
}

#[tokio::test]
async fn login_reports_missing_fields_and_bad_passwords() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.post("/api/login/", None, json!({ "username": "admin@iasd.local" })).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["fields"], json!(["password"]));

    let res = server
        .post("/api/login/", None, json!({ "email": "admin@iasd.local", "password": "wrong" }))
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
