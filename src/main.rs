//! Drug Catalog Backend
//!
//! REST backend for a public drug price catalog and the admin data-management
//! tools behind it, on top of a remote JSON document store.

mod api;
mod auth;
mod catalog;
mod clock;
mod config;
mod errors;
mod manager;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog::CatalogEditor;
use clock::{Clock, SystemClock};
use config::Config;
use manager::DataManager;
use store::{DocumentStore, HttpDocumentStore, MemoryStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub manager: Arc<DataManager>,
    pub editor: Arc<CatalogEditor>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            manager: Arc::new(DataManager::new(store.clone(), clock.clone())),
            editor: Arc::new(CatalogEditor::new(store.clone(), clock)),
            store,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Drug Catalog Backend");
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (DRUGCAT_API_PSK). Authentication is disabled!");
    }

    let store: Arc<dyn DocumentStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory document store; data is lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        tracing::info!("Document store: {}", config.store_url);
        Arc::new(HttpDocumentStore::new(&config.store_url))
    };

    let state = AppState::new(store, Arc::new(SystemClock), config.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    let admin_routes = Router::new()
        // Catalog entries
        .route("/drugs", post(api::add_drug))
        .route("/drugs/{slot}", put(api::update_drug).delete(api::delete_drug))
        // Content pages
        .route("/pages/{name}", get(api::get_page).put(api::put_page))
        // Data management
        .route("/data", axum::routing::delete(api::delete_all_data))
        .route("/data/import/file", post(api::import_file))
        .route("/data/import/url", post(api::import_url))
        .route("/data/export", get(api::export_data))
        .route("/data/restore", post(api::restore_data))
        .route("/data/backups", get(api::list_backups))
        .route("/logs", get(api::get_logs))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let api_routes = Router::new()
        .route("/catalog", get(api::browse_catalog))
        .nest("/admin", admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
