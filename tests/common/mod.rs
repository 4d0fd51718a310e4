#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

/// A seeded `church-api` process on its own port and database.
/// The process is killed and the database removed on drop.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    child: Child,
    _data: TempDir,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let data = tempfile::tempdir().context("failed to create temp dir")?;
        let database_url = format!("sqlite://{}", data.path().join("church.db").display());
        let media_root = data.path().join("media");

        // Seed first so the server starts against a complete database
        let status = Command::new(env!("CARGO_BIN_EXE_church-admin"))
            .arg("seed")
            .envs(server_env(&database_url, &media_root))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .context("failed to run church-admin seed")?;
        anyhow::ensure!(status.success(), "church-admin seed failed: {status}");

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_church-api"))
            .envs(server_env(&database_url, &media_root))
            .env("API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            child,
            _data: data,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/login/"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login for {username} failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<reqwest::Response> {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.header("Authorization", format!("Token {token}"));
        }
        Ok(req.send().await?)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<reqwest::Response> {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.header("Authorization", format!("Token {token}"));
        }
        Ok(req.send().await?)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn server_env(database_url: &str, media_root: &std::path::Path) -> Vec<(&'static str, String)> {
    vec![
        ("APP_ENV", "development".to_string()),
        ("DATABASE_URL", database_url.to_string()),
        ("MEDIA_ROOT", media_root.display().to_string()),
        ("API_HOST", "127.0.0.1".to_string()),
        ("SECURITY_PASSWORD_HASH_COST", "4".to_string()),
        ("SECURITY_TOKEN_TTL_HOURS", "0".to_string()),
    ]
}
