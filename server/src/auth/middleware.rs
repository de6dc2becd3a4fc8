//! Application id check.
//!
//! Every object request names the application it belongs to in the
//! `X-App-Id` header. When the server is configured with an `APP_ID`, the
//! header must match it; otherwise any caller is accepted.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::AppState;

/// Header carrying the application id.
pub const APP_ID_HEADER: &str = "x-app-id";

/// Caller identity extracted from the request.
#[derive(Debug, Clone)]
pub struct AppAuth {
    /// The application id the caller presented, if any
    pub app_id: Option<String>,
}

impl FromRequestParts<AppState> for AppAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(APP_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        match (&state.config.app_id, presented) {
            // No app id configured, allow anonymous access
            (None, presented) => Ok(AppAuth { app_id: presented }),
            (Some(expected), Some(presented)) if *expected == presented => Ok(AppAuth {
                app_id: Some(presented),
            }),
            (Some(_), Some(_)) => Err(AppError::Unauthorized(
                "Unknown application id".to_string(),
            )),
            (Some(_), None) => Err(AppError::Unauthorized(
                "Missing X-App-Id header".to_string(),
            )),
        }
    }
}
