//! Cluster file model.
//!
//! Only the parts the plugin engine consumes are modelled here: the cluster
//! identity, free-form render context, and plugin configuration at cluster and
//! node-pool scope.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::PluginConfigs;
use crate::error::ApiResult;
use crate::values::Values;

/// Parsed `cluster.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClusterModel {
    pub cluster_name: String,
    #[serde(default)]
    pub region: String,
    /// Extra keys exposed at the top level of every render context.
    #[serde(default)]
    pub context: Values,
    /// Cluster-scope plugin configuration.
    #[serde(default)]
    pub plugins: PluginConfigs,
    #[serde(default)]
    pub worker: WorkerModel,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkerModel {
    #[serde(default)]
    pub node_pools: Vec<NodePoolModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolModel {
    pub name: String,
    /// Node-pool-scope plugin configuration, layered over the cluster scope.
    #[serde(default)]
    pub plugins: PluginConfigs,
}

impl ClusterModel {
    /// Load a cluster file.
    pub fn from_file(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        debug!("Reading cluster model from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ApiResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn node_pool(&self, name: &str) -> Option<&NodePoolModel> {
        self.worker.node_pools.iter().find(|np| np.name == name)
    }

    /// Render context for cluster-wide artifacts.
    pub fn render_context(&self) -> Value {
        let mut ctx = self.context.clone();
        ctx.insert("clusterName".to_string(), json!(self.cluster_name));
        ctx.insert("region".to_string(), json!(self.region));
        Value::Object(ctx)
    }

    /// Render context for one node pool's artifacts.
    pub fn node_pool_context(&self, node_pool: &NodePoolModel) -> Value {
        let mut ctx = self.render_context();
        if let Value::Object(map) = &mut ctx {
            map.insert("nodePool".to_string(), json!({ "name": node_pool.name }));
        }
        ctx
    }
}
