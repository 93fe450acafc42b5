//! Secret Santa Backend
//!
//! A REST backend managing an employee roster and the Secret Santa draw,
//! with SQLite blob persistence.

mod api;
mod assignment;
mod auth;
mod config;
mod db;
mod errors;
mod exchange;
mod import;
mod models;
mod roster;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::BlobStore;
use exchange::ExchangeService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ExchangeService>,
    pub config: Arc<Config>,
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

    tracing::info!("Starting Secret Santa Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (SANTA_API_PSK). Authentication is disabled!");
    }

    // Initialize the blob store and rebuild the exchange from it
    let pool = db::init_database(&config.db_path).await?;
    let blobs = BlobStore::new(pool);
    let service = Arc::new(ExchangeService::load(blobs).await?);

    // Create application state
    let state = AppState {
        service: service.clone(),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Final flush on teardown
    service.flush().await?;
    tracing::info!("Exchange state flushed, shutting down");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");
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

    // API routes
    let api_routes = Router::new()
        // Members
        .route("/members", get(api::list_members))
        .route("/members", post(api::create_member))
        .route("/members/{id}", get(api::get_member))
        .route("/members/{id}", put(api::update_member))
        .route("/members/{id}", delete(api::delete_member))
        // Import
        .route("/import/preview", post(api::preview_import))
        .route("/import/confirm", post(api::confirm_import))
        // Assignments
        .route("/assignments", get(api::list_assignments))
        .route("/assignments", delete(api::clear_assignments))
        .route("/assignments/{memberId}", get(api::get_assignment))
        // Draws
        .route("/draws/bulk", post(api::bulk_draw))
        .route("/draws/individual", post(api::request_individual_draw))
        .route("/draws/individual", delete(api::cancel_individual_draw))
        .route("/draws/individual/select", post(api::select_from_pool))
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

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
