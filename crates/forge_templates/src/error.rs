//! Error types for templates.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while rendering plugin content.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to render {path} of plugin {plugin}: {message}")]
    Render {
        plugin: String,
        path: String,
        message: String,
    },

    #[error("Asset path {path} of plugin {plugin} escapes the plugin directory")]
    AssetOutsidePlugin { plugin: String, path: String },

    #[error("Empty asset loaded from {0}")]
    MissingAsset(PathBuf),

    #[error("Failed to decode token {token} as a literal string: {message}")]
    TokenDecode { token: String, message: String },

    #[error("Expected a JSON object in {what} of plugin {plugin}, got {found}")]
    NotAnObject {
        plugin: String,
        what: String,
        found: &'static str,
    },

    #[error("Binary content cannot be used as text in {what} of plugin {plugin}")]
    BinaryAsText { plugin: String, what: String },

    #[error("Content of {what} in plugin {plugin} is not valid UTF-8")]
    NotUtf8 { plugin: String, what: String },

    #[error("Failed to read asset {path}: {source}")]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
