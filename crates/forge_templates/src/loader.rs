//! Loading of plugin asset files.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use forge_api::PLUGINS_DIR;

use crate::error::{TemplateError, TemplateResult};

/// Reads files referenced by `source.path` from a plugin's directory.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    /// Create a loader for assets below `<root>/plugins`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of `relative` inside the directory of `plugin`.
    pub fn asset_path(&self, plugin: &str, relative: &str) -> TemplateResult<PathBuf> {
        let rel = Path::new(relative);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(TemplateError::AssetOutsidePlugin {
                plugin: plugin.to_string(),
                path: relative.to_string(),
            });
        }
        Ok(self.root.join(PLUGINS_DIR).join(plugin).join(rel))
    }

    /// Read an asset. Empty files are reported as missing.
    pub fn load(&self, plugin: &str, relative: &str) -> TemplateResult<Vec<u8>> {
        let path = self.asset_path(plugin, relative)?;
        debug!("Loading asset {:?}", path);

        let bytes = fs::read(&path).map_err(|source| TemplateError::Asset {
            path: path.clone(),
            source,
        })?;
        if bytes.is_empty() {
            return Err(TemplateError::MissingAsset(path));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_asset(root: &Path, plugin: &str, rel: &str, data: &[u8]) {
        let path = root.join(PLUGINS_DIR).join(plugin).join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_load_asset() {
        let temp = tempdir().unwrap();
        write_asset(temp.path(), "my-plugin", "assets/unit.service", b"[Unit]\n");

        let loader = AssetLoader::new(temp.path());
        assert_eq!(loader.load("my-plugin", "assets/unit.service").unwrap(), b"[Unit]\n");
    }

    #[test]
    fn test_empty_asset_is_missing() {
        let temp = tempdir().unwrap();
        write_asset(temp.path(), "p", "empty.txt", b"");

        let err = AssetLoader::new(temp.path()).load("p", "empty.txt").unwrap_err();
        assert!(matches!(err, TemplateError::MissingAsset(_)));
    }

    #[test]
    fn test_absent_asset_is_io_error() {
        let temp = tempdir().unwrap();
        let err = AssetLoader::new(temp.path()).load("p", "nope.txt").unwrap_err();
        assert!(matches!(err, TemplateError::Asset { .. }));
    }

    #[test]
    fn test_rejects_paths_outside_plugin() {
        let loader = AssetLoader::new("/assets");
        for bad in ["../other/secret", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(
                    loader.asset_path("p", bad),
                    Err(TemplateError::AssetOutsidePlugin { .. })
                ),
                "{bad} should be rejected"
            );
        }
        assert_eq!(
            loader.asset_path("p", "./files/x").unwrap(),
            PathBuf::from("/assets/plugins/p/./files/x")
        );
    }
}
