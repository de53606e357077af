use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wiki_service::config::AppConfig;
use wiki_service::Wiki;

#[derive(Parser)]
#[command(name = "wiki-service")]
#[command(about = "Wiki with an async service proxy in front of its page store")]
#[command(version)]
struct Args {
    /// HTTP port (overrides WIKI_HTTP_PORT / PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// YAML realm of users and roles (overrides WIKI_USERS_FILE)
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// YAML file of SQL statements (overrides WIKIDB_SQL_QUERIES_FILE)
    #[arg(long)]
    queries_file: Option<PathBuf>,
}

impl Args {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = self.port {
            config.http.port = port;
        }
        if let Some(url) = self.database_url {
            config.database.url = url;
        }
        if let Some(path) = self.users_file {
            config.security.users_file = Some(path);
        }
        if let Some(path) = self.queries_file {
            config.database.queries_file = Some(path);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Args::parse().apply(wiki_service::config::config().clone());
    tracing::info!("Starting wiki service in {:?} mode", config.environment);

    let wiki = Wiki::start(&config).await?;
    let app = wiki.router();

    let bind_addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Wiki service listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    wiki.worker.shutdown().await;
    Ok(())
}
