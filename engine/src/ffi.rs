//! FFI layer for host-language bindings.
//!
//! This module provides C-compatible functions over an [`OperationRecorder`].
//! All structured data crosses the boundary as JSON strings.
//!
//! # Memory Management
//!
//! - Strings returned by `opledger_*` functions are allocated by Rust
//! - Caller must free them with `opledger_string_free`
//! - Recorder pointers must be freed with `opledger_recorder_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure

use crate::{LedgerSnapshot, Operation, OperationKind, OperationRecorder};
use serde_json::Value;
use std::ffi::{c_char, CStr, CString};

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

impl<T: serde::Serialize> From<crate::error::Result<T>> for FfiResult<T> {
    fn from(result: crate::error::Result<T>) -> Self {
        match result {
            Ok(value) => FfiResult::ok(value),
            Err(e) => FfiResult::err(e.to_string()),
        }
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `opledger_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained null bytes - return error JSON
        Err(_) => c"{\"error\":\"string contained null bytes\"}"
            .to_owned()
            .into_raw(),
    }
}

fn error_response(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse `{"kind": "...", "key": "...", "value": ...}`.
///
/// An absent `value` and `"value": null` are different: the first is a
/// payload-less operation, the second sets the field to null.
fn parse_append_request(json: &str) -> Result<Operation, String> {
    let request: Value = serde_json::from_str(json).map_err(|e| format!("parse error: {}", e))?;
    let obj = request
        .as_object()
        .ok_or_else(|| "append request must be an object".to_string())?;

    let kind: OperationKind = obj
        .get("kind")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing operation kind".to_string())?
        .parse()
        .map_err(|e: crate::Error| e.to_string())?;
    let key = obj
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing field key".to_string())?;

    Operation::new(kind, key, obj.get("value").cloned()).map_err(|e| e.to_string())
}

// ============================================================================
// Recorder Lifecycle
// ============================================================================

/// Create a new, empty recorder.
///
/// # Returns
/// Pointer to OperationRecorder. Free with `opledger_recorder_free`.
#[no_mangle]
pub extern "C" fn opledger_recorder_new() -> *mut OperationRecorder {
    Box::into_raw(Box::new(OperationRecorder::new()))
}

/// Free a recorder.
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_free(recorder: *mut OperationRecorder) {
    if !recorder.is_null() {
        drop(Box::from_raw(recorder));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from an `opledger_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn opledger_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Recording
// ============================================================================

/// Record an operation.
///
/// # Arguments
/// - `request_json`: `{"kind": "Increment", "key": "age", "value": 1}`
///
/// # Returns
/// JSON string: `{"ok": Operation}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - `request_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_append(
    recorder: *mut OperationRecorder,
    request_json: *const c_char,
) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    let request = match from_c_string(request_json) {
        Some(s) => s,
        None => return error_response("invalid append request"),
    };

    match parse_append_request(&request) {
        Ok(operation) => {
            let recorded = recorder.append_operation(operation);
            to_c_string(FfiResult::ok(recorded).to_json())
        }
        Err(message) => error_response(message),
    }
}

/// Stage untraced operations.
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_stage(recorder: *mut OperationRecorder) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    recorder.stage();
    to_c_string(FfiResult::ok(()).to_json())
}

/// Stage and reduce.
///
/// # Returns
/// JSON string: `{"ok": {key: Operation, ...}}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_reduce(recorder: *mut OperationRecorder) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    to_c_string(FfiResult::from(recorder.reduce()).to_json())
}

/// Stage, reduce and encode as a request body.
///
/// # Returns
/// JSON string: `{"ok": {key: wire value, ...}}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_payload(recorder: *mut OperationRecorder) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    to_c_string(FfiResult::from(recorder.payload()).to_json())
}

/// Forget the staged set after a successful round trip.
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_clear_staged(
    recorder: *mut OperationRecorder,
) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    recorder.clear_staged();
    to_c_string(FfiResult::ok(()).to_json())
}

/// Every operation ever recorded.
///
/// # Returns
/// JSON string: `{"ok": [Operation, ...]}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_all(recorder: *const OperationRecorder) -> *mut c_char {
    let recorder = match recorder.as_ref() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    to_c_string(FfiResult::ok(recorder.all()).to_json())
}

/// Count of staged plus untraced operations, or -1 for a null pointer.
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_pending_count(
    recorder: *const OperationRecorder,
) -> i64 {
    match recorder.as_ref() {
        Some(r) => (r.staged_count() + r.untraced_count()) as i64,
        None => -1,
    }
}

// ============================================================================
// Snapshots
// ============================================================================

/// Export the ledger as a snapshot.
///
/// # Returns
/// JSON string: `{"ok": LedgerSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_export(
    recorder: *const OperationRecorder,
) -> *mut c_char {
    let recorder = match recorder.as_ref() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    to_c_string(FfiResult::ok(recorder.export_state()).to_json())
}

/// Replace the ledger with a snapshot.
///
/// # Returns
/// JSON string: `{"ok": null}` or `{"error": "message"}`
///
/// # Safety
/// - `recorder` must be a valid pointer from `opledger_recorder_new` or null
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `opledger_string_free`
#[no_mangle]
pub unsafe extern "C" fn opledger_recorder_import(
    recorder: *mut OperationRecorder,
    snapshot_json: *const c_char,
) -> *mut c_char {
    let recorder = match recorder.as_mut() {
        Some(r) => r,
        None => return error_response("null recorder pointer"),
    };

    let snapshot_str = match from_c_string(snapshot_json) {
        Some(s) => s,
        None => return error_response("invalid snapshot JSON"),
    };

    let snapshot: LedgerSnapshot = match serde_json::from_str(&snapshot_str) {
        Ok(s) => s,
        Err(e) => return error_response(format!("parse error: {}", e)),
    };

    to_c_string(FfiResult::from(recorder.import_state(snapshot)).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn opledger_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the snapshot format version.
#[no_mangle]
pub extern "C" fn opledger_snapshot_format_version() -> u32 {
    crate::SNAPSHOT_FORMAT_VERSION
}
