//! # forge_extension
//!
//! Composition of plugin contributions into cluster artifacts.
//!
//! A [`ClusterExtension`] walks the loaded plugins in load order, skips the
//! ones disabled in the current scope, and folds the rest into:
//!
//! - a [`StackFragment`] per [`StackLayer`],
//! - the [`ControllerExtension`], [`WorkerExtension`] and [`EtcdExtension`]
//!   machine payloads,
//! - the list of PKI [`KeyPairSpec`](forge_api::KeyPairSpec)s to issue.
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_api::{ClusterModel, PluginLoader};
//! use forge_extension::{ClusterExtension, Enablement};
//! use forge_templates::{AssetLoader, RenderContext};
//!
//! let plugins = PluginLoader::new("assets").load_all().unwrap();
//! let cluster = ClusterModel::from_file("cluster.yaml").unwrap();
//! let enablement = Enablement::cluster(&cluster.plugins);
//! let loader = AssetLoader::new("assets");
//!
//! let ext = ClusterExtension::new(&plugins, &enablement, &loader);
//! let ctx = RenderContext::from_value(cluster.render_context());
//! let controller = ext.controller(&ctx).unwrap();
//! println!("{} units", controller.machine.units.len());
//! ```

pub mod error;
pub mod extension;
pub mod keypairs;
pub mod machine;
pub mod observer;
pub mod registry;
pub mod stack;

pub use error::{CompositionError, ExtensionResult, PluginError};
pub use extension::ClusterExtension;
pub use machine::{
    plugin_file_path, ArchivedFile, ControllerExtension, CustomFile, EtcdExtension,
    HelmReleaseFileset, KubeletPayload, MachinePayload, RemoteFile, SystemdUnit,
    WorkerExtension, PLUGIN_FILES_ROOT,
};
pub use observer::{CompositionObserver, TracingObserver};
pub use registry::Enablement;
pub use stack::{StackFragment, StackLayer};
