//! Error types for WASM bindings.

use thiserror::Error;
use wasm_bindgen::prelude::*;

/// Errors that can occur in the WASM bindings.
#[derive(Debug, Error)]
pub enum WasmError {
    /// Sync engine operation failed.
    #[error("sync error: {0}")]
    Sync(String),

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JavaScript error occurred.
    #[error("JS error: {0}")]
    JsError(String),

    /// Feature not supported in current browser.
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Renders a thrown JS value as text.
pub(crate) fn js_message(val: &JsValue) -> String {
    val.as_string().unwrap_or_else(|| format!("{:?}", val))
}

impl From<WasmError> for JsValue {
    fn from(err: WasmError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<JsValue> for WasmError {
    fn from(val: JsValue) -> Self {
        WasmError::JsError(js_message(&val))
    }
}

impl From<tabstore_engine::SyncError> for WasmError {
    fn from(err: tabstore_engine::SyncError) -> Self {
        WasmError::Sync(err.to_string())
    }
}

/// Result type for WASM operations.
pub type WasmResult<T> = Result<T, WasmError>;
