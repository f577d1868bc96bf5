//! Plugins command - List plugins in load order.

use anyhow::{Context, Result};
use clap::Args;

use forge_api::{ClusterModel, PluginList, PluginLoader};
use forge_extension::Enablement;

use super::ClusterArgs;

#[derive(Args)]
pub struct PluginsArgs {
    #[command(flatten)]
    cluster: ClusterArgs,
}

pub fn execute(args: PluginsArgs) -> Result<()> {
    let cluster = ClusterModel::from_file(&args.cluster.cluster)
        .with_context(|| format!("Failed to read cluster file {:?}", args.cluster.cluster))?;
    let assets_dir = args.cluster.assets_dir();
    let plugins = PluginLoader::new(&assets_dir)
        .load_all()
        .with_context(|| format!("Failed to load plugins from {:?}", assets_dir))?;

    if plugins.is_empty() {
        println!("No plugins found in {:?}", assets_dir);
        return Ok(());
    }

    for line in plugin_lines(&plugins, &Enablement::cluster(&cluster.plugins)) {
        println!("{}", line);
    }
    Ok(())
}

/// One line per plugin: position, name, version and cluster-scope state.
fn plugin_lines(plugins: &PluginList, enablement: &Enablement) -> Vec<String> {
    plugins
        .iter()
        .enumerate()
        .map(|(i, plugin)| {
            let state = if enablement.enabled_config(plugin).is_some() {
                "enabled"
            } else {
                "disabled"
            };
            format!("{:>3}  {:<24} {:<10} {}", i + 1, plugin.name(), plugin.version(), state)
        })
        .collect()
}
