//! Plugin discovery.
//!
//! Plugins live under `<root>/plugins/<name>/plugin.yaml`. The returned
//! [`PluginList`] is ordered by plugin directory name, which makes the load
//! order stable across machines and runs.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{ApiError, ApiResult};
use crate::plugin::{Plugin, PluginList};

/// Directory under the assets root that holds plugins.
pub const PLUGINS_DIR: &str = "plugins";

const MANIFEST_NAMES: [&str; 2] = ["plugin.yaml", "plugin.yml"];

/// Loads every plugin below an assets root.
pub struct PluginLoader {
    root: PathBuf,
}

impl PluginLoader {
    /// Create a loader for `<root>/plugins`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn plugins_path(&self) -> PathBuf {
        self.root.join(PLUGINS_DIR)
    }

    /// Load all plugins, sorted by directory name.
    pub fn load_all(&self) -> ApiResult<PluginList> {
        let plugins_path = self.plugins_path();
        if !plugins_path.exists() {
            warn!("Plugins directory does not exist: {:?}", plugins_path);
            return Ok(PluginList::default());
        }

        let mut plugins = Vec::new();
        let mut seen = HashSet::new();

        for entry in WalkDir::new(&plugins_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let plugin = self.load_plugin(path)?;
            if !seen.insert(plugin.name().to_string()) {
                return Err(ApiError::DuplicatePlugin(plugin.name().to_string()));
            }
            info!("Loaded plugin: {} ({})", plugin.name(), plugin.version());
            plugins.push(plugin);
        }

        Ok(PluginList::new(plugins))
    }

    /// Load a single plugin from its directory.
    pub fn load_plugin(&self, dir: &Path) -> ApiResult<Plugin> {
        let manifest = MANIFEST_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
            .ok_or_else(|| ApiError::NotFound(dir.join(MANIFEST_NAMES[0])))?;

        debug!("Loading plugin manifest from {:?}", manifest);
        let content = fs::read_to_string(&manifest)?;
        let plugin: Plugin = serde_yaml::from_str(&content).map_err(|e| ApiError::InvalidPlugin {
            path: manifest.clone(),
            message: e.to_string(),
        })?;

        if plugin.name().is_empty() {
            return Err(ApiError::InvalidPlugin {
                path: manifest,
                message: "metadata.name is required".to_string(),
            });
        }

        // Plugin assets are resolved by plugin name, so the directory must match it.
        let dir_name = dir.file_name().map(|n| n.to_string_lossy().to_string());
        if dir_name.as_deref() != Some(plugin.name()) {
            return Err(ApiError::InvalidPlugin {
                path: manifest,
                message: format!(
                    "plugin '{}' must live in a directory named after it",
                    plugin.name()
                ),
            });
        }

        Ok(plugin)
    }
}
