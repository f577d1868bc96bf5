//! Error types for plugin composition.

use thiserror::Error;

use forge_api::ApiError;
use forge_templates::TemplateError;

/// Result type alias for composition operations.
pub type ExtensionResult<T> = Result<T, CompositionError>;

/// Errors returned by the composition entry points.
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("Plugin {plugin} failed while composing {artifact}: {source}")]
    Plugin {
        plugin: String,
        artifact: String,
        #[source]
        source: PluginError,
    },
}

impl CompositionError {
    /// Name of the failing plugin.
    pub fn plugin(&self) -> &str {
        match self {
            CompositionError::Plugin { plugin, .. } => plugin,
        }
    }
}

/// Failure inside a single plugin's contribution.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Merge(#[from] ApiError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Kubernetes manifest #{index} has neither a name nor a source path")]
    MissingManifestName { index: usize },

    #[error("File name {name} points outside the plugin's directory")]
    FileOutsidePlugin { name: String },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
