//! Opledger Server - reference object store for opledger payloads.
//!
//! Clients record field operations with opledger-engine, reduce them, and
//! send the encoded payload here. The server evaluates each operation
//! against the stored object and keeps the result in memory.

mod auth;
mod config;
mod error;
mod handlers;
mod routes;
mod store;

pub use auth::{AppAuth, APP_ID_HEADER};
pub use config::{Config, ConfigError};
pub use error::AppError;
pub use routes::API_VERSION;
pub use store::{ObjectStore, StoredObject};

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ObjectStore>,
    pub config: Arc<Config>,
}

impl AppState {
    /// State with an empty store.
    pub fn new(config: Config) -> Self {
        Self {
            store: ObjectStore::new_shared(),
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
