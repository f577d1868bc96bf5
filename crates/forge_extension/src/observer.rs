//! Composition progress reporting.

use tracing::{debug, info};

/// Receives progress events while plugins are composed.
#[cfg_attr(test, mockall::automock)]
pub trait CompositionObserver: Send + Sync {
    /// A plugin was skipped because it is disabled in the current scope.
    fn plugin_skipped(&self, plugin: &str, artifact: &str);

    /// A plugin finished contributing `contributions` items to `artifact`.
    fn plugin_contributed(&self, plugin: &str, artifact: &str, contributions: usize);

    /// A single piece of content was resolved.
    fn resolved(&self, plugin: &str, what: &str);
}

/// Observer that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CompositionObserver for TracingObserver {
    fn plugin_skipped(&self, plugin: &str, artifact: &str) {
        debug!("Skipping disabled plugin {} for {}", plugin, artifact);
    }

    fn plugin_contributed(&self, plugin: &str, artifact: &str, contributions: usize) {
        info!(
            "Plugin {} contributed {} item(s) to {}",
            plugin, contributions, artifact
        );
    }

    fn resolved(&self, plugin: &str, what: &str) {
        debug!("Resolved {} of plugin {}", what, plugin);
    }
}
