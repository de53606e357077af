// server.rs - application state, router assembly and startup wiring
//
// Startup order: pool -> catalog -> repository (table created) -> worker on
// the bus -> proxy -> HTTP state. The HTTP side only ever sees the proxy.

use axum::{middleware::from_fn_with_state, routing::get, routing::post, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{AuthError, CredentialRealm, SessionStore, TokenIssuer};
use crate::backup::{BackupClient, BackupError, GistBackup};
use crate::bus::{BusError, EventBus, ServiceWorker, WikiDatabaseProxy, WorkerHandle};
use crate::config::AppConfig;
use crate::database::{
    CatalogError, ConnectionScope, DatabaseManager, PageRepository, QueryCatalog, StorageError, WikiDatabaseService,
};
use crate::handlers;
use crate::middleware::{jwt_auth_middleware, require_session};
use crate::render::{RenderError, TemplateEngine, Templates};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pages: Arc<dyn WikiDatabaseService>,
    pub realm: Arc<CredentialRealm>,
    pub tokens: Arc<TokenIssuer>,
    pub sessions: SessionStore,
    pub templates: Arc<dyn TemplateEngine>,
    pub backup: Arc<dyn BackupClient>,
    pub pool: SqlitePool,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// A fully wired service: HTTP state plus the worker serving the page store
pub struct Wiki {
    pub state: AppState,
    pub worker: WorkerHandle,
    pub repository: PageRepository,
}

impl Wiki {
    pub async fn start(config: &AppConfig) -> Result<Self, StartupError> {
        let backup = GistBackup::new(&config.backup)?;
        Self::start_with_backup(config, Arc::new(backup)).await
    }

    /// Same as [`Wiki::start`] with a caller-supplied backup client
    pub async fn start_with_backup(
        config: &AppConfig,
        backup: Arc<dyn BackupClient>,
    ) -> Result<Self, StartupError> {
        let pool = DatabaseManager::connect(&config.database).await?;

        let catalog = match &config.database.queries_file {
            Some(path) => QueryCatalog::from_yaml_file(path)?,
            None => QueryCatalog::builtin(),
        };

        let repository = PageRepository::new(ConnectionScope::new(pool.clone()), Arc::new(catalog));
        repository.initialize().await?;

        let bus = EventBus::new();
        let worker = ServiceWorker::spawn(
            &bus,
            &config.channel.address,
            config.channel.mailbox_capacity,
            Arc::new(repository.clone()),
        )
        .await?;
        let proxy = WikiDatabaseProxy::new(bus, config.channel.address.clone(), config.channel.reply_timeout());

        let realm = match &config.security.users_file {
            Some(path) => CredentialRealm::from_yaml_file(path)?,
            None => CredentialRealm::builtin(),
        };

        let state = AppState {
            pages: Arc::new(proxy),
            realm: Arc::new(realm),
            tokens: Arc::new(TokenIssuer::new(&config.security)?),
            sessions: SessionStore::new(config.security.session_ttl_minutes),
            templates: Arc::new(Templates::embedded()?),
            backup,
            pool,
        };

        info!("Wiki service ready; page store at '{}'", config.channel.address);
        Ok(Self {
            state,
            worker,
            repository,
        })
    }

    pub fn router(&self) -> Router {
        app(self.state.clone())
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(login_routes())
        .merge(web_routes(state.clone()))
        .merge(api_routes(state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

fn login_routes() -> Router<AppState> {
    use handlers::web::login;

    Router::new()
        .route("/login", get(login::login_form))
        .route("/login-auth", post(login::login_auth))
        .route("/logout", get(login::logout))
}

fn web_routes(state: AppState) -> Router<AppState> {
    use handlers::web::{actions, backup, index, page};

    Router::new()
        .route("/", get(index::index))
        .route("/wiki/:page", get(page::page_view))
        .route("/action/save", post(actions::save))
        .route("/action/create", post(actions::create))
        .route("/action/delete", post(actions::delete))
        .route("/action/backup", get(backup::backup))
        .route_layer(from_fn_with_state(state, require_session))
}

fn api_routes(state: AppState) -> Router<AppState> {
    use handlers::api::{pages, token};

    let protected = Router::new()
        .route("/api/pages", get(pages::list).post(pages::create))
        .route(
            "/api/pages/:id",
            get(pages::show).put(pages::update).delete(pages::delete),
        )
        .route_layer(from_fn_with_state(state, jwt_auth_middleware));

    Router::new().route("/api/token", get(token::token)).merge(protected)
}
