//! Contract Drift Gate Server
//!
//! Session-scoped HTTP surface over the drift core: inject contract-change
//! mutations, add overrides, set the gate policy, run the pipeline and read
//! the resulting snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DRIFT SERVER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Bearer   │  │  Session Engine         │ │
//! │  │  Router   │  │  Token    │  │  (per-session locks)    │ │
//! │  │  (Axum)   │  │  (opt.)   │  │  Arc<ScenarioCatalog>   │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │           ┌───────────────────────────┐                    │
//! │           │ Snapshot store            │                    │
//! │           │ memory | fs | PostgreSQL  │                    │
//! │           └───────────────────────────┘                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use drift_core::{EngineConfig, FileStore, MemoryStore, ScenarioCatalog, SessionEngine, SnapshotStore};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{Config, StorageDriver};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "drift_server=debug,drift_core=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    config.validate().context("invalid configuration")?;

    tracing::info!("Drift server starting ({})...", config.environment);
    if config.is_production() && config.auth_token().is_none() {
        tracing::warn!("Running in production without DRIFT_API_TOKEN; API routes are open");
    }

    let catalog = ScenarioCatalog::load(&config.catalog_path)
        .with_context(|| format!("loading catalog {}", config.catalog_path))?;
    tracing::info!(
        "Catalog: {} services, {} edges, checksum {}",
        catalog.services().len(),
        catalog.edges().len(),
        catalog.truth().lineage_checksum
    );

    let store = open_store(&config).await?;
    let state = AppState::new(Arc::new(catalog), store, config.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Snapshot store for the configured driver
async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    let store: Arc<dyn SnapshotStore> = match config.driver() {
        StorageDriver::Memory => {
            tracing::info!("Storage: in-memory (sessions are lost on restart)");
            Arc::new(MemoryStore::new())
        }
        StorageDriver::Fs => {
            tracing::info!("Storage: filesystem at {}", config.data_dir);
            Arc::new(FileStore::new(&config.data_dir))
        }
        StorageDriver::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for postgres storage")?;
            tracing::info!("Storage: postgres at {}", url.split('@').last().unwrap_or("***"));

            let pool = db::create_pool(url).await.context("creating database pool")?;
            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await.context("running migrations")?;
            Arc::new(db::PgSnapshotStore::new(pool))
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SessionEngine>,
    pub config: Config,
    /// SHA-256 of the API token when auth is enabled
    pub token_hash: Option<String>,
}

impl AppState {
    pub fn new(catalog: Arc<ScenarioCatalog>, store: Arc<dyn SnapshotStore>, config: Config) -> Self {
        let engine_config = EngineConfig {
            catalog_miss: config.miss_policy(),
            artifact_prefix: config.artifact_prefix.clone(),
        };
        let token_hash = config.auth_token().map(middleware::auth::hash_token);

        Self {
            engine: Arc::new(SessionEngine::new(catalog, store, engine_config)),
            config,
            token_hash,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check));

    // API routes (bearer token when configured)
    let api_routes = Router::new()
        .route("/api/v1/catalog", get(handlers::catalog::summary))

        // Sessions
        .route("/api/v1/sessions", post(handlers::sessions::create).get(handlers::sessions::list))
        .route("/api/v1/sessions/:id/snapshot", get(handlers::sessions::snapshot))
        .route("/api/v1/sessions/:id/mutations", post(handlers::sessions::inject_mutation))
        .route("/api/v1/sessions/:id/run", post(handlers::sessions::run))
        .route("/api/v1/sessions/:id/policy", post(handlers::sessions::set_policy))
        .route("/api/v1/sessions/:id/override", post(handlers::sessions::add_override))

        // Side queries
        .route("/api/v1/sessions/:id/escalation", get(handlers::escalation::resolve))
        .route("/api/v1/sessions/:id/artifact", get(handlers::artifacts::export))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_api_token
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================
