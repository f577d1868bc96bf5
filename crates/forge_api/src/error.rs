//! Error types for the plugin and cluster data model.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for data model operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while loading or merging plugin data.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Plugin not found at path: {0}")]
    NotFound(PathBuf),

    #[error("Invalid plugin in {path}: {message}")]
    InvalidPlugin { path: PathBuf, message: String },

    #[error("Duplicate plugin name: {0}")]
    DuplicatePlugin(String),

    #[error("Cannot merge values at '{path}': {defaults} in defaults but {overrides} in overrides")]
    MergeConflict {
        path: String,
        defaults: &'static str,
        overrides: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
