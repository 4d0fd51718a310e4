mod common;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

struct Account {
    token: String,
    user_id: i64,
    profile_id: i64,
}

async fn register(server: &TestServer, email: &str) -> Result<Account> {
    let res = server
        .post("/api/register/", None, json!({ "email": email, "password": "StrongPass123!" }))
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    let token = body["token"].as_str().context("no token")?.to_string();
    let me: Value = server.get("/api/auth/me/", Some(&token)).await?.json().await?;
    Ok(Account {
        user_id: me["id"].as_i64().context("no user id")?,
        profile_id: me["profile_id"].as_i64().context("no profile id")?,
        token,
    })
}

fn id_named(items: &Value, name: &str) -> Result<i64> {
    items
        .as_array()
        .and_then(|items| items.iter().find(|item| item["name"] == name))
        .and_then(|item| item["id"].as_i64())
        .with_context(|| format!("{name} not listed"))
}

/// The Musica group with an extra promoting role ranked between Membro and Lider
struct Fixture {
    group: i64,
    church: i64,
    leader_role: i64,
    member_role: i64,
    admin: String,
}

async fn fixture(server: &TestServer) -> Result<(Fixture, i64)> {
    let admin = server.login("admin@iasd.local", "Admin123!").await?;
    let groups: Value = server.get("/api/groups/", Some(&admin)).await?.json().await?;
    let group = id_named(&groups, "Musica")?;
    let detail: Value = server.get(&format!("/api/groups/{group}/"), Some(&admin)).await?.json().await?;
    let church = detail["church_id"].as_i64().context("no church id")?;

    let roles: Value = server.get(&format!("/api/groups/{group}/roles/"), Some(&admin)).await?.json().await?;
    let leader_role = id_named(&roles, "Lider")?;
    let member_role = id_named(&roles, "Membro")?;

    let res = server
        .post(
            &format!("/api/groups/{group}/roles/"),
            Some(&admin),
            json!({ "name": "Auxiliar", "rank": 5, "can_promote_members": true }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let assistant_role = res.json::<Value>().await?["id"].as_i64().context("no role id")?;

    Ok((
        Fixture {
            group,
            church,
            leader_role,
            member_role,
            admin,
        },
        assistant_role,
    ))
}

async fn join(server: &TestServer, f: &Fixture, profile_id: i64, role: Option<i64>) -> Result<()> {
    let mut body = json!({ "profile": profile_id });
    if let Some(role) = role {
        body["role"] = json!(role);
    }
    let res = server
        .post(&format!("/api/groups/{}/members/", f.group), Some(&f.admin), body)
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    Ok(())
}

async fn role_of(server: &TestServer, f: &Fixture, profile_id: i64) -> Result<Option<String>> {
    let members: Value = server
        .get(&format!("/api/groups/{}/members/", f.group), Some(&f.admin))
        .await?
        .json()
        .await?;
    Ok(members
        .as_array()
        .and_then(|members| members.iter().find(|m| m["profile_id"] == profile_id))
        .and_then(|m| m["role_name"].as_str().map(str::to_string)))
}

#[tokio::test]
async fn promoters_cannot_touch_members_ranked_above_them() -> Result<()> {
    let server = TestServer::start().await?;
    let (f, assistant_role) = fixture(&server).await?;

    let assistant = register(&server, "auxiliar@iasd.local").await?;
    let leader = register(&server, "lider@iasd.local").await?;
    let plain = register(&server, "novo@iasd.local").await?;
    join(&server, &f, assistant.profile_id, Some(assistant_role)).await?;
    join(&server, &f, leader.profile_id, Some(f.leader_role)).await?;
    join(&server, &f, plain.profile_id, None).await?;

    let demote = format!("/api/groups/{}/members/{}/promote/", f.group, leader.profile_id);
    let res = server
        .post(&demote, Some(&assistant.token), json!({ "role": f.member_role }))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(role_of(&server, &f, leader.profile_id).await?.as_deref(), Some("Lider"));

    let kick = format!("/api/groups/{}/members/{}/delete/", f.group, leader.profile_id);
    let res = server.post(&kick, Some(&assistant.token), json!({})).await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(role_of(&server, &f, leader.profile_id).await?.as_deref(), Some("Lider"));

    // Members at or below the promoter's rank are fair game, up to that rank
    let promote = format!("/api/groups/{}/members/{}/promote/", f.group, plain.profile_id);
    let res = server
        .post(&promote, Some(&assistant.token), json!({ "role": f.leader_role }))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let res = server
        .post(&promote, Some(&assistant.token), json!({ "role": f.member_role }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(role_of(&server, &f, plain.profile_id).await?.as_deref(), Some("Membro"));
    Ok(())
}

#[tokio::test]
async fn church_staff_may_promote_to_any_role() -> Result<()> {
    let server = TestServer::start().await?;
    let (f, _) = fixture(&server).await?;

    let staffer = register(&server, "secretaria@iasd.local").await?;
    let plain = register(&server, "novo@iasd.local").await?;
    join(&server, &f, plain.profile_id, None).await?;

    let res = server
        .post(
            &format!("/api/churches/{}/staff/", f.church),
            Some(&f.admin),
            json!({ "user": staffer.user_id, "role": "STAFF" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let promote = format!("/api/groups/{}/members/{}/promote/", f.group, plain.profile_id);
    let res = server
        .post(&promote, Some(&staffer.token), json!({ "role": f.leader_role }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(role_of(&server, &f, plain.profile_id).await?.as_deref(), Some("Lider"));
    Ok(())
}
