//! Error types for the table widget
//!
//! Three failure families exist: a native pane refused a request, a model
//! capability reported failure, or persisted layout data could not be
//! (de)serialized. Mapping misses are not errors; they surface as `None`.

use thiserror::Error;

/// A native pane primitive refused a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("native call failed: {op}")]
pub struct NativeError {
    pub op: &'static str,
}

impl NativeError {
    pub fn new(op: &'static str) -> Self {
        Self { op }
    }
}

/// A model capability (sort, set checked, populate) reported failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model error: {message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("invalid layout state: {0}")]
    Layout(#[from] serde_json::Error),

    #[error("settings store: {0}")]
    Settings(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("column index {0} out of bounds")]
    ColumnIndex(usize),
}

pub type Result<T> = std::result::Result<T, TableError>;
