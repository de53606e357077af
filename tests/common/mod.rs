#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{redirect, StatusCode};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(envs: &[(&str, String)]) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Cargo builds the binary for integration tests and tells us where it is
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wiki-service"));
        cmd.env("APP_ENV", "development")
            .env("WIKI_HTTP_HOST", "127.0.0.1")
            .env("WIKI_HTTP_PORT", port.to_string())
            .env("DATABASE_URL", "sqlite::memory:")
            .env_remove("WIKI_USERS_FILE")
            .env_remove("WIKIDB_SQL_QUERIES_FILE")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
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
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    ensure_server_with(&[]).await
}

/// Same as [`ensure_server`]; `envs` only take effect for the first caller in a test binary
pub async fn ensure_server_with(envs: &[(&str, String)]) -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn(envs).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Client that leaves redirects to the test
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("reqwest client")
}

/// Bearer header value for `login`/`password` via GET /api/token
pub async fn bearer(server: &TestServer, login: &str, password: &str) -> Result<String> {
    let res = reqwest::Client::new()
        .get(server.url("/api/token"))
        .header("login", login)
        .header("password", password)
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "token request failed: {}", res.status());
    Ok(format!("Bearer {}", res.text().await?))
}

/// Session cookie (`name=value`) after a form login
pub async fn login(server: &TestServer, username: &str, password: &str) -> Result<String> {
    let res = browser()
        .post(server.url("/login-auth"))
        .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form(&[("username", username), ("password", password)]))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::FOUND, "login failed: {}", res.status());

    let cookie = res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .context("login set no cookie")?
        .to_str()?;
    Ok(cookie.split(';').next().unwrap_or_default().to_string())
}

/// `application/x-www-form-urlencoded` body
pub fn form(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

/// Unique page name so tests sharing one server do not collide
pub fn page_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
