//! Plugin enablement per scope.

use tracing::debug;

use forge_api::{ApiResult, Plugin, PluginConfig, PluginConfigs};

/// Effective plugin configuration for one scope.
///
/// The cluster scope uses the cluster file's plugin configs as is. A node-pool
/// scope layers the pool's overrides on top: `enabled` is replaced, values are
/// deep-merged with the override winning, and plugins the pool does not
/// mention keep their cluster configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enablement {
    configs: PluginConfigs,
}

impl Enablement {
    pub fn cluster(configs: &PluginConfigs) -> Self {
        Self {
            configs: configs.clone(),
        }
    }

    pub fn node_pool(cluster: &PluginConfigs, overrides: &PluginConfigs) -> ApiResult<Self> {
        debug!(
            "Layering {} node pool override(s) over {} cluster plugin config(s)",
            overrides.len(),
            cluster.len()
        );
        Ok(Self {
            configs: cluster.merge(overrides)?,
        })
    }

    /// Whether the plugin named `name` is enabled. Unknown plugins are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.configs.get(name).map_or(false, |pc| pc.enabled)
    }

    /// Whether any configuration exists for `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.configs.contains(name)
    }

    pub fn effective_config(&self, name: &str) -> Option<&PluginConfig> {
        self.configs.get(name)
    }

    /// Configuration for `plugin`, by name and then by setting key.
    pub fn config_for(&self, plugin: &Plugin) -> Option<&PluginConfig> {
        self.configs.for_plugin(plugin)
    }

    /// Configuration for `plugin` if it is enabled.
    pub fn enabled_config(&self, plugin: &Plugin) -> Option<&PluginConfig> {
        self.config_for(plugin).filter(|pc| pc.enabled)
    }

    pub fn configs(&self) -> &PluginConfigs {
        &self.configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs(yaml: &str) -> PluginConfigs {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_cluster_scope() {
        let e = Enablement::cluster(&configs("a:\n  enabled: true\nb:\n  enabled: false\n"));

        assert!(e.is_enabled("a"));
        assert!(!e.is_enabled("b"));
        assert!(e.exists("b"));
        assert!(!e.is_enabled("c"));
        assert!(!e.exists("c"));
        assert!(e.effective_config("c").is_none());
    }

    #[test]
    fn test_node_pool_override() {
        let cluster = configs("a:\n  enabled: true\n  queue:\n    name: bar\n    size: 1\nb:\n  enabled: true\n");
        let pool = configs("a:\n  enabled: true\n  queue:\n    name: baz\n");

        let e = Enablement::node_pool(&cluster, &pool).unwrap();
        let a = e.effective_config("a").unwrap();
        assert_eq!(a.values["queue"]["name"], "baz");
        assert_eq!(a.values["queue"]["size"], 1);
        assert!(e.is_enabled("b"));
    }

    #[test]
    fn test_node_pool_can_disable_and_enable() {
        let cluster = configs("a:\n  enabled: true\n");
        let pool = configs("a:\n  enabled: false\nlate:\n  enabled: true\n");

        let e = Enablement::node_pool(&cluster, &pool).unwrap();
        assert!(!e.is_enabled("a"));
        assert!(e.is_enabled("late"));
    }

    #[test]
    fn test_override_without_enabled_disables() {
        let cluster = configs("a:\n  enabled: true\n");
        let pool = configs("a:\n  x: 1\n");

        let e = Enablement::node_pool(&cluster, &pool).unwrap();
        assert!(!e.is_enabled("a"));
    }

    #[test]
    fn test_node_pool_merge_conflict() {
        let cluster = configs("a:\n  enabled: true\n  queue:\n    name: bar\n");
        let pool = configs("a:\n  enabled: true\n  queue: flat\n");

        assert!(Enablement::node_pool(&cluster, &pool).is_err());
    }

    #[test]
    fn test_pool_setting_key_disables_cluster_name() {
        let cluster = configs("my-plugin:\n  enabled: true\n");
        let pool = configs("myPlugin:\n  enabled: false\n");
        let plugin = Plugin::new("my-plugin", "0.1.0");

        let e = Enablement::node_pool(&cluster, &pool).unwrap();
        assert!(e.enabled_config(&plugin).is_none());
        assert!(!e.config_for(&plugin).unwrap().enabled);
    }

    #[test]
    fn test_pool_name_merges_into_cluster_setting_key() {
        let cluster = configs("myPlugin:\n  enabled: true\n  queue:\n    name: bar\n    size: 1\n");
        let pool = configs("my-plugin:\n  enabled: true\n  queue:\n    name: baz\n");
        let plugin = Plugin::new("my-plugin", "0.1.0");

        let e = Enablement::node_pool(&cluster, &pool).unwrap();
        let pc = e.enabled_config(&plugin).unwrap();
        assert_eq!(pc.values["queue"]["name"], "baz");
        assert_eq!(pc.values["queue"]["size"], 1);
        assert_eq!(e.configs().len(), 1);
    }

    #[test]
    fn test_config_for_setting_key() {
        let e = Enablement::cluster(&configs("myPlugin:\n  enabled: true\n"));
        let plugin = Plugin::new("my-plugin", "0.1.0");

        assert!(e.enabled_config(&plugin).is_some());
        assert!(!e.is_enabled("my-plugin"));
    }
}
