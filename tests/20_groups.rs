mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashSet;

use common::TestServer;

fn names(groups: &Value) -> Vec<String> {
    let mut names: Vec<String> = groups
        .as_array()
        .map(|items| items.iter().filter_map(|g| g["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    names.sort();
    names
}

fn ids(items: &Value, key: &str) -> Vec<i64> {
    items
        .as_array()
        .map(|items| items.iter().filter_map(|item| item[key].as_i64()).collect())
        .unwrap_or_default()
}

const GROUP_SCOPED: [&str; 3] = ["/api/postagens-grupos/", "/api/comentarios-postagens/", "/api/atividades/"];

#[tokio::test]
async fn group_listing_requires_a_token() -> Result<()> {
    let server = TestServer::start().await?;
    let res = server.get("/api/grupos/", None).await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["detail"], "Auth token required.");
    Ok(())
}

#[tokio::test]
async fn members_see_only_their_groups() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("membro@iasd.local", "Member123!").await?;

    let res = server.get("/api/grupos/", Some(&token)).await?;
    assert_eq!(res.status(), StatusCode::OK);
    let groups: Value = res.json().await?;
    assert_eq!(names(&groups), vec!["Infantil"]);

    // Same handler under the English path
    let groups: Value = server.get("/api/groups/", Some(&token)).await?.json().await?;
    assert_eq!(names(&groups), vec!["Infantil"]);
    Ok(())
}

#[tokio::test]
async fn elevated_callers_see_every_group() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("elder@iasd.local", "Elder123!").await?;

    let groups: Value = server.get("/api/grupos/", Some(&token)).await?.json().await?;
    assert_eq!(names(&groups), vec!["Infantil", "Midia", "Musica"]);
    Ok(())
}

#[tokio::test]
async fn group_scoped_lists_stay_inside_the_callers_groups() -> Result<()> {
    let server = TestServer::start().await?;
    let token = server.login("membro@iasd.local", "Member123!").await?;

    let groups: Value = server.get("/api/groups/", Some(&token)).await?.json().await?;
    let own: HashSet<i64> = ids(&groups, "id").into_iter().collect();
    assert_eq!(own.len(), 1);
    let infantil = *own.iter().next().unwrap_or(&0);

    let res = server
        .post("/api/posts/", Some(&token), json!({ "group": infantil, "content": "Ensaio das criancas" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    for path in GROUP_SCOPED {
        let res = server.get(path, Some(&token)).await?;
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        let items: Value = res.json().await?;
        for group_id in ids(&items, "group_id") {
            assert!(own.contains(&group_id), "{path} leaked group {group_id}");
        }
    }

    // The seeded Musica post is hidden; the member's own post is listed
    let posts: Value = server.get("/api/postagens-grupos/", Some(&token)).await?.json().await?;
    assert_eq!(ids(&posts, "group_id"), vec![infantil]);
    Ok(())
}

#[tokio::test]
async fn elevated_callers_see_every_group_scoped_item() -> Result<()> {
    let server = TestServer::start().await?;
    let member = server.login("membro@iasd.local", "Member123!").await?;
    let elder = server.login("elder@iasd.local", "Elder123!").await?;

    let all_groups: Value = server.get("/api/groups/", Some(&elder)).await?.json().await?;
    let all: HashSet<i64> = ids(&all_groups, "id").into_iter().collect();

    for path in GROUP_SCOPED {
        let seen: Value = server.get(path, Some(&elder)).await?.json().await?;
        let seen = ids(&seen, "group_id");
        assert!(!seen.is_empty(), "{path} is empty for an elder");
        assert!(seen.iter().all(|group_id| all.contains(group_id)), "{path}");

        let limited: Value = server.get(path, Some(&member)).await?.json().await?;
        assert!(ids(&limited, "group_id").len() < seen.len(), "{path}");
    }
    Ok(())
}
