//! # forge_api
//!
//! Data model for kubeforge plugins and clusters.
//!
//! This crate describes what a plugin may contribute to a cluster and how
//! users configure plugins. It also owns the deep merge used to combine plugin
//! defaults with user overrides, and the loaders for plugin directories and
//! cluster files.
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_api::{ClusterModel, PluginLoader};
//!
//! let plugins = PluginLoader::new(".").load_all().unwrap();
//! let cluster = ClusterModel::from_file("cluster.yaml").unwrap();
//!
//! for plugin in &plugins {
//!     let enabled = cluster
//!         .plugins
//!         .for_plugin(plugin)
//!         .map_or(false, |pc| pc.enabled);
//!     println!("{} enabled={}", plugin.name(), enabled);
//! }
//! ```

pub mod cluster;
pub mod config;
pub mod content;
pub mod error;
pub mod loader;
pub mod plugin;
pub mod values;

pub use cluster::{ClusterModel, NodePoolModel, WorkerModel};
pub use config::{PluginConfig, PluginConfigs};
pub use content::{ContentKind, ContentSource, ContentSpec, FileSpec};
pub use error::{ApiError, ApiResult};
pub use loader::{PluginLoader, PLUGINS_DIR};
pub use plugin::{
    ApiServerSpec, ApiServerVolume, ClusterSpec, CommandLineFlag, ComponentSpec,
    ContainerVolumeMount, HelmReleaseSpec, IamPolicyStatement, KeyPairSpec, KubernetesSpec,
    ManifestSpec, Plugin, PluginList, PluginMetadata, RoleSpec, StackSpec, Stacks,
    SystemdUnitSpec,
};
pub use values::{merge_values, Values};
