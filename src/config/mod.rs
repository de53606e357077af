use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub channel: ChannelConfig,
    pub security: SecurityConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds a caller may wait for a pooled connection
    pub acquire_timeout: u64,
    /// Optional YAML file overriding the built-in SQL statements
    pub queries_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Well-known bus address of the page store worker
    pub address: String,
    pub reply_timeout_ms: u64,
    pub mailbox_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_issuer: String,
    pub jwt_subject: String,
    /// Optional YAML realm of users and roles; the built-in realm is used otherwise
    pub users_file: Option<PathBuf>,
    pub session_ttl_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub description: String,
    pub public: bool,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl ChannelConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // HTTP overrides
        if let Ok(v) = env::var("WIKI_HTTP_HOST") {
            self.http.host = v;
        }
        if let Some(port) = env::var("WIKI_HTTP_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse().ok())
        {
            self.http.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT") {
            self.database.acquire_timeout = v.parse().unwrap_or(self.database.acquire_timeout);
        }
        if let Ok(v) = env::var("WIKIDB_SQL_QUERIES_FILE") {
            self.database.queries_file = Some(PathBuf::from(v));
        }

        // Channel overrides
        if let Ok(v) = env::var("WIKIDB_QUEUE") {
            self.channel.address = v;
        }
        if let Ok(v) = env::var("WIKIDB_REPLY_TIMEOUT_MS") {
            self.channel.reply_timeout_ms = v.parse().unwrap_or(self.channel.reply_timeout_ms);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("WIKI_USERS_FILE") {
            self.security.users_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("SECURITY_SESSION_TTL_MINUTES") {
            self.security.session_ttl_minutes = v.parse().unwrap_or(self.security.session_ttl_minutes);
        }

        // Backup overrides
        if let Ok(v) = env::var("BACKUP_ENDPOINT") {
            self.backup.endpoint = v;
        }
        if let Ok(v) = env::var("BACKUP_TOKEN") {
            self.backup.token = Some(v);
        }
        if let Ok(v) = env::var("BACKUP_PUBLIC") {
            self.backup.public = v.parse().unwrap_or(self.backup.public);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            http: HttpConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 4,
                min_connections: 1,
                acquire_timeout: 30,
                queries_file: None,
            },
            channel: ChannelConfig {
                address: "wikidb.queue".to_string(),
                reply_timeout_ms: 30_000,
                mailbox_capacity: 256,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24,
                jwt_issuer: "wiki-service".to_string(),
                jwt_subject: "Wiki API".to_string(),
                users_file: None,
                session_ttl_minutes: 60 * 12,
            },
            backup: BackupConfig {
                endpoint: "https://api.github.com/gists".to_string(),
                user_agent: "wiki-service".to_string(),
                description: "A wiki backup".to_string(),
                public: true,
                token: None,
                timeout_secs: 30,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.http.host = "0.0.0.0".to_string();
        config.database.url = "sqlite://wiki.db?mode=rwc".to_string();
        config.database.max_connections = 8;
        config.database.acquire_timeout = 10;
        config.channel.reply_timeout_ms = 10_000;
        config.security.jwt_secret = String::new();
        config.backup.public = false;
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 16;
        config.database.acquire_timeout = 5;
        config.channel.reply_timeout_ms = 5_000;
        config.security.jwt_expiry_hours = 4;
        config.security.session_ttl_minutes = 60;
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
