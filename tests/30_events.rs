mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

async fn church_id(server: &TestServer) -> Result<i64> {
    let church: Value = server.get("/api/church/", None).await?.json().await?;
    Ok(church["id"].as_i64().expect("church id"))
}

#[tokio::test]
async fn events_must_end_after_they_start() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("admin@iasd.local", "Admin123!").await?;
    let church = church_id(&server).await?;

    let res = server
        .post(
            "/api/events/create/",
            Some(&token),
            json!({
                "church": church,
                "title": "Vigilia",
                "starts_at": "2030-05-10T22:00:00Z",
                "ends_at": "2030-05-10T20:00:00Z"
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["fields"], json!(["ends_at"]));
    Ok(())
}

#[tokio::test]
async fn confirmations_show_up_in_participations() -> Result<()> {
    let server = TestServer::start().await?;
    let admin = server.login("admin@iasd.local", "Admin123!").await?;
    let member = server.login("membro@iasd.local", "Member123!").await?;
    let church = church_id(&server).await?;

    let res = server
        .post(
            "/api/events/",
            Some(&admin),
            json!({
                "church": church,
                "title": "Jantar Beneficente",
                "starts_at": "2030-06-01T19:00",
                "ends_at": "2030-06-01T22:00",
                "capacity": 1
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let event: Value = res.json().await?;
    let event_id = event["id"].as_i64().expect("event id");

    let res = server.post(&format!("/api/events/{event_id}/confirm/"), Some(&member), json!({})).await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let participation: Value = res.json().await?;
    assert_eq!(participation["status"], "CONFIRMED");
    assert!(participation["confirmed_at"].is_string());

    // Capacity is reached, so the next confirmation is refused
    let res = server.post(&format!("/api/events/{event_id}/confirm/"), Some(&admin), json!({})).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let mine: Value = server.get("/api/participations/", Some(&member)).await?.json().await?;
    let ids: Vec<i64> = mine
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|p| p["event_id"].as_i64())
        .collect();
    assert_eq!(ids, vec![event_id]);
    Ok(())
}

#[tokio::test]
async fn upcoming_events_are_public() -> Result<()> {
    let server = TestServer::start().await?;
    let res = server.get("/api/events/upcoming/", None).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let events: Value = res.json().await?;
    assert_eq!(events[0]["title"], "Culto de Celebracao");
    Ok(())
}
