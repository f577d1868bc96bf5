//! User-supplied plugin configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiResult;
use crate::plugin::{to_lower_camel_case, Plugin};
use crate::values::{merge_values, Values};

/// One user override for one plugin at one scope.
///
/// In YAML the values sit next to `enabled`:
///
/// ```yaml
/// myPlugin:
///   enabled: true
///   queue:
///     name: baz
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PluginConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub values: Values,
}

impl PluginConfig {
    pub fn enabled(values: Values) -> Self {
        Self {
            enabled: true,
            values,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Layer `other` on top of this config.
    ///
    /// `enabled` is taken from `other` as is; values are deep-merged with
    /// `other` winning.
    pub fn merge(&self, other: &PluginConfig) -> ApiResult<PluginConfig> {
        let merged = PluginConfig {
            enabled: other.enabled,
            values: merge_values(&self.values, &other.values)?,
        };
        debug!("Merged plugin config {:?} into {:?}", other, self);
        Ok(merged)
    }
}

/// Plugin configurations keyed by plugin name or setting key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct PluginConfigs(BTreeMap<String, PluginConfig>);

impl PluginConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, config: PluginConfig) -> Self {
        self.insert(name, config);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, config: PluginConfig) {
        self.0.insert(name.into(), config);
    }

    pub fn get(&self, name: &str) -> Option<&PluginConfig> {
        self.0.get(name)
    }

    /// Config for a plugin, looked up by name and then by setting key.
    pub fn for_plugin(&self, plugin: &Plugin) -> Option<&PluginConfig> {
        self.0
            .get(plugin.name())
            .or_else(|| self.0.get(&plugin.setting_key()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PluginConfig)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key of the entry configuring the same plugin as `name`.
    ///
    /// An exact match wins; otherwise `my-plugin` and `myPlugin` name the
    /// same plugin.
    fn equivalent_key(&self, name: &str) -> Option<&String> {
        if let Some((key, _)) = self.0.get_key_value(name) {
            return Some(key);
        }
        let wanted = to_lower_camel_case(name);
        self.0.keys().find(|key| to_lower_camel_case(key) == wanted)
    }

    /// Layer `overrides` on top of these configs.
    ///
    /// Plugins only present here are kept unchanged; plugins present in
    /// `overrides` are merged with [`PluginConfig::merge`], starting from a
    /// disabled, empty config when this side has none. An override spelled by
    /// plugin name merges into an entry spelled by setting key and vice versa;
    /// the result keeps this side's key.
    pub fn merge(&self, overrides: &PluginConfigs) -> ApiResult<PluginConfigs> {
        let mut merged = self.clone();
        for (name, config) in &overrides.0 {
            let key = merged
                .equivalent_key(name)
                .cloned()
                .unwrap_or_else(|| name.clone());
            debug!("Merging plugin config override for {} into {}", name, key);
            let base = merged.0.get(&key).cloned().unwrap_or_default();
            merged.0.insert(key, base.merge(config)?);
        }
        Ok(merged)
    }
}

impl FromIterator<(String, PluginConfig)> for PluginConfigs {
    fn from_iter<I: IntoIterator<Item = (String, PluginConfig)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg(yaml: &str) -> PluginConfigs {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_inline_values() {
        let configs = cfg(
            r#"
myPlugin:
  enabled: true
  queue:
    name: baz1
"#,
        );

        let pc = configs.get("myPlugin").unwrap();
        assert!(pc.enabled);
        assert_eq!(pc.values["queue"]["name"], "baz1");
        assert!(!pc.values.contains_key("enabled"));
    }

    #[test]
    fn test_merge_replaces_enabled_and_merges_values() {
        let cluster = cfg(
            r#"
myPlugin:
  enabled: true
  a: 1
  b:
    c: 2
other:
  enabled: true
"#,
        );
        let pool = cfg(
            r#"
myPlugin:
  enabled: false
  b:
    c: 3
  d: 4
"#,
        );

        let merged = cluster.merge(&pool).unwrap();
        let pc = merged.get("myPlugin").unwrap();
        assert!(!pc.enabled);
        assert_eq!(
            serde_json::Value::Object(pc.values.clone()),
            json!({"a": 1, "b": {"c": 3}, "d": 4})
        );
        assert!(merged.get("other").unwrap().enabled);
    }

    #[test]
    fn test_merge_new_plugin_from_override() {
        let merged = PluginConfigs::new()
            .merge(&cfg("late:\n  enabled: true\n  x: 1\n"))
            .unwrap();

        let pc = merged.get("late").unwrap();
        assert!(pc.enabled);
        assert_eq!(pc.values["x"], 1);
    }

    #[test]
    fn test_merge_matches_name_and_setting_key() {
        let merged = cfg("my-plugin:\n  enabled: true\n")
            .merge(&cfg("myPlugin:\n  enabled: false\n"))
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert!(!merged.get("my-plugin").unwrap().enabled);

        let merged = cfg("myPlugin:\n  enabled: true\n  a: 1\n")
            .merge(&cfg("my-plugin:\n  enabled: true\n  b: 2\n"))
            .unwrap();
        assert_eq!(merged.len(), 1);
        let pc = merged.for_plugin(&Plugin::new("my-plugin", "0.0.1")).unwrap();
        assert_eq!(
            serde_json::Value::Object(pc.values.clone()),
            json!({"a": 1, "b": 2})
        );
    }

    #[test]
    fn test_lookup_by_setting_key() {
        let configs = cfg("myPlugin:\n  enabled: true\n");
        let plugin = Plugin::new("my-plugin", "0.0.1");
        assert!(configs.for_plugin(&plugin).unwrap().enabled);

        let exact = configs.clone().with("my-plugin", PluginConfig::disabled());
        assert!(!exact.for_plugin(&plugin).unwrap().enabled);
    }
}
