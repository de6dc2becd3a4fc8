//! Object endpoint routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use opledger_engine::Payload;
use serde_json::{json, Value};

use crate::auth::AppAuth;
use crate::error::Result;
use crate::handlers::{
    handle_create, handle_delete, handle_fetch, handle_update, CreateResponse, UpdateResponse,
};
use crate::AppState;

/// Version prefix of the object API.
pub const API_VERSION: &str = "1.1";

/// Create object routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            &format!("/{API_VERSION}/classes/{{class}}"),
            post(create_handler),
        )
        .route(
            &format!("/{API_VERSION}/classes/{{class}}/{{id}}"),
            put(update_handler).get(fetch_handler).delete(delete_handler),
        )
}

/// POST /1.1/classes/{class} - Create an object.
async fn create_handler(
    State(state): State<AppState>,
    _auth: AppAuth,
    Path(class): Path<String>,
    Json(payload): Json<Payload>,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let response = handle_create(&state.store, &class, payload)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /1.1/classes/{class}/{id} - Apply operations to an object.
async fn update_handler(
    State(state): State<AppState>,
    _auth: AppAuth,
    Path((class, id)): Path<(String, String)>,
    Json(payload): Json<Payload>,
) -> Result<Json<UpdateResponse>> {
    let response = handle_update(&state.store, &class, &id, payload)?;
    Ok(Json(response))
}

/// GET /1.1/classes/{class}/{id} - Fetch an object.
async fn fetch_handler(
    State(state): State<AppState>,
    _auth: AppAuth,
    Path((class, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let object = handle_fetch(&state.store, &class, &id)?;
    Ok(Json(object))
}

/// DELETE /1.1/classes/{class}/{id} - Delete an object.
async fn delete_handler(
    State(state): State<AppState>,
    _auth: AppAuth,
    Path((class, id)): Path<(String, String)>,
) -> Result<Json<Value>> {
    handle_delete(&state.store, &class, &id)?;
    Ok(Json(json!({})))
}
