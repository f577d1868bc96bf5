//! Render command - Compose every artifact for a cluster.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tracing::info;

use forge_api::{ClusterModel, KeyPairSpec, NodePoolModel, PluginList, PluginLoader};
use forge_extension::{
    ClusterExtension, ControllerExtension, Enablement, EtcdExtension, StackFragment, StackLayer,
    WorkerExtension,
};
use forge_templates::{AssetLoader, RenderContext};

use super::{ClusterArgs, InvalidArgument};

#[derive(Args)]
pub struct RenderArgs {
    #[command(flatten)]
    cluster: ClusterArgs,

    /// Only render these node pools (repeatable); all pools by default
    #[arg(short, long = "node-pool")]
    node_pools: Vec<String>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Everything composed for one cluster.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub stacks: BTreeMap<&'static str, StackFragment>,
    pub controller: ControllerExtension,
    pub etcd: EtcdExtension,
    pub node_pools: BTreeMap<String, NodePoolOutput>,
    pub keypairs: Vec<KeyPairSpec>,
}

#[derive(Debug, Serialize)]
pub struct NodePoolOutput {
    pub stack: StackFragment,
    pub worker: WorkerExtension,
}

pub fn execute(args: RenderArgs) -> Result<()> {
    let cluster = ClusterModel::from_file(&args.cluster.cluster)
        .with_context(|| format!("Failed to read cluster file {:?}", args.cluster.cluster))?;
    let assets_dir = args.cluster.assets_dir();
    let plugins = PluginLoader::new(&assets_dir)
        .load_all()
        .with_context(|| format!("Failed to load plugins from {:?}", assets_dir))?;

    let output = compose(&cluster, &plugins, &assets_dir, &args.node_pools)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", json);
    Ok(())
}

/// Compose the cluster-wide artifacts and those of the selected node pools.
pub fn compose(
    cluster: &ClusterModel,
    plugins: &PluginList,
    assets_dir: &Path,
    node_pools: &[String],
) -> Result<RenderOutput> {
    info!(
        "Composing cluster {} with {} plugin(s)",
        cluster.cluster_name,
        plugins.len()
    );

    let loader = AssetLoader::new(assets_dir);
    let enablement = Enablement::cluster(&cluster.plugins);
    let ext = ClusterExtension::new(plugins, &enablement, &loader);
    let ctx = RenderContext::from_value(cluster.render_context());

    let mut stacks = BTreeMap::new();
    for layer in [
        StackLayer::Root,
        StackLayer::Network,
        StackLayer::Etcd,
        StackLayer::ControlPlane,
    ] {
        let fragment = ext
            .stack(layer, &ctx, &ctx)
            .with_context(|| format!("Failed to compose the {}", layer))?;
        stacks.insert(layer.name(), fragment);
    }

    let controller = ext.controller(&ctx).context("Failed to compose the controller")?;
    let etcd = ext.etcd(&ctx).context("Failed to compose etcd")?;
    let keypairs = ext.key_pair_specs(&ctx).context("Failed to compose keypairs")?;

    let mut pools = BTreeMap::new();
    for pool in select_node_pools(cluster, node_pools)? {
        info!("Composing node pool {}", pool.name);
        let enablement = Enablement::node_pool(&cluster.plugins, &pool.plugins)
            .with_context(|| format!("Invalid plugin config for node pool {}", pool.name))?;
        let ext = ClusterExtension::new(plugins, &enablement, &loader);
        let ctx = RenderContext::from_value(cluster.node_pool_context(pool));

        let output = NodePoolOutput {
            stack: ext
                .node_pool_stack(&ctx, &ctx)
                .with_context(|| format!("Failed to compose the stack of node pool {}", pool.name))?,
            worker: ext
                .worker(&ctx)
                .with_context(|| format!("Failed to compose workers of node pool {}", pool.name))?,
        };
        pools.insert(pool.name.clone(), output);
    }

    Ok(RenderOutput {
        stacks,
        controller,
        etcd,
        node_pools: pools,
        keypairs,
    })
}

fn select_node_pools<'c>(
    cluster: &'c ClusterModel,
    names: &[String],
) -> Result<Vec<&'c NodePoolModel>> {
    if names.is_empty() {
        return Ok(cluster.worker.node_pools.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            cluster.node_pool(name).ok_or_else(|| {
                InvalidArgument(format!("node pool {} is not defined in the cluster file", name))
                    .into()
            })
        })
        .collect()
}
