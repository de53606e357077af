// Wiki backup to a gist-style HTTP endpoint

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::BackupConfig;
use crate::database::PageRecord;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Invalid backup endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("Backup transport error: {0}")]
    Transport(String),

    #[error("Could not backup the wiki: {status} {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Backup response carried no html_url")]
    MissingUrl,
}

impl From<reqwest::Error> for BackupError {
    fn from(err: reqwest::Error) -> Self {
        BackupError::Transport(err.to_string())
    }
}

/// Ships every page somewhere durable and reports where it went
#[async_trait]
pub trait BackupClient: Send + Sync {
    async fn backup(&self, pages: &[PageRecord]) -> Result<String, BackupError>;
}

/// `{files: {<name>: {content}}, description, public}`
pub fn gist_payload(pages: &[PageRecord], description: &str, public: bool) -> Value {
    let files: Map<String, Value> = pages
        .iter()
        .map(|page| (page.name.clone(), json!({ "content": page.content })))
        .collect();

    json!({
        "files": files,
        "description": description,
        "public": public,
    })
}

pub struct GistBackup {
    client: reqwest::Client,
    endpoint: Url,
    description: String,
    public: bool,
    token: Option<String>,
}

impl GistBackup {
    pub fn new(config: &BackupConfig) -> Result<Self, BackupError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|_| BackupError::InvalidEndpoint(config.endpoint.clone()))?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            description: config.description.clone(),
            public: config.public,
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl BackupClient for GistBackup {
    async fn backup(&self, pages: &[PageRecord]) -> Result<String, BackupError> {
        let payload = gist_payload(pages, &self.description, self.public);

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(header::ACCEPT, "application/vnd.github.v3+json")
            .json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("HTTP client error during backup: {}", e);
            BackupError::from(e)
        })?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!("Could not backup the wiki: {} {}", status, body);
            return Err(BackupError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let url = body
            .get("html_url")
            .and_then(Value::as_str)
            .ok_or(BackupError::MissingUrl)?
            .to_string();

        info!("Backed up {} pages to {}", pages.len(), url);
        Ok(url)
    }
}
