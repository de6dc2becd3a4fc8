//! HTTP route definitions.

mod classes;
mod health;

pub use classes::API_VERSION;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(classes::routes())
}
