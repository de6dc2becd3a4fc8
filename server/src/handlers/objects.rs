//! Object handlers - apply operation payloads to stored objects.

use crate::error::{AppError, Result};
use crate::store::{reserved_field, timestamp, ObjectStore};
use opledger_engine::Payload;
use serde::Serialize;
use serde_json::Value;

/// Response for object creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub object_id: String,
    pub created_at: String,
}

/// Response for object update.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    pub updated_at: String,
}

/// Class names start with a letter and hold only letters, digits and `_`.
pub fn validate_class_name(class: &str) -> Result<()> {
    let mut chars = class.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid class name: {}", class)))
    }
}

fn check_payload(payload: &Payload) -> Result<()> {
    match reserved_field(payload) {
        Some(field) => Err(AppError::BadRequest(format!(
            "Field {} is managed by the server",
            field
        ))),
        None => Ok(()),
    }
}

fn not_found(class: &str, object_id: &str) -> AppError {
    AppError::NotFound(format!("No {} object with id {}", class, object_id))
}

/// Create an object from a payload.
pub fn handle_create(store: &ObjectStore, class: &str, payload: Payload) -> Result<CreateResponse> {
    validate_class_name(class)?;
    check_payload(&payload)?;

    let object = store.create(class, &payload)?;
    tracing::info!(class = %class, object_id = %object.object_id, fields = payload.len(), "Created object");

    Ok(CreateResponse {
        object_id: object.object_id,
        created_at: timestamp(&object.created_at),
    })
}

/// Apply a payload to an existing object.
pub fn handle_update(
    store: &ObjectStore,
    class: &str,
    object_id: &str,
    payload: Payload,
) -> Result<UpdateResponse> {
    validate_class_name(class)?;
    check_payload(&payload)?;

    let object = store
        .update(class, object_id, &payload)?
        .ok_or_else(|| not_found(class, object_id))?;
    tracing::info!(class = %class, object_id = %object_id, fields = payload.len(), "Updated object");

    Ok(UpdateResponse {
        updated_at: timestamp(&object.updated_at),
    })
}

/// Fetch an object's fields and metadata.
pub fn handle_fetch(store: &ObjectStore, class: &str, object_id: &str) -> Result<Value> {
    validate_class_name(class)?;
    store
        .get(class, object_id)
        .map(|object| object.to_json())
        .ok_or_else(|| not_found(class, object_id))
}

/// Delete an object.
pub fn handle_delete(store: &ObjectStore, class: &str, object_id: &str) -> Result<()> {
    validate_class_name(class)?;
    if store.delete(class, object_id) {
        tracing::info!(class = %class, object_id = %object_id, "Deleted object");
        Ok(())
    } else {
        Err(not_found(class, object_id))
    }
}
