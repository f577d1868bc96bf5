//! CLI command definitions.

use clap::{Parser, Subcommand};
use thiserror::Error;

pub mod plugins;
pub mod render;
pub mod version;

/// kubeforge - compose cluster artifacts from plugins
#[derive(Parser)]
#[command(name = "kubeforge")]
#[command(version, about = "kubeforge - compose cluster artifacts from plugins")]
#[command(long_about = r#"
kubeforge loads the plugins below an assets directory, applies the plugin
configuration of a cluster file, and prints the composed stack fragments,
machine payloads and keypair requests as JSON.

COMMANDS:
  render   → Compose every artifact for a cluster
  plugins  → List plugins in load order with their enablement
  version  → Print the version

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Plugin or cluster file load error
  4 - Template or composition error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose stacks, machine payloads and keypairs for a cluster
    Render(render::RenderArgs),

    /// List plugins in load order
    Plugins(plugins::PluginsArgs),

    /// Print version information
    Version,
}

/// A command-line value that does not match the cluster file.
#[derive(Error, Debug)]
#[error("Invalid argument: {0}")]
pub struct InvalidArgument(pub String);

/// Arguments shared by commands that read a cluster.
#[derive(clap::Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Path to the cluster file
    #[arg(short, long, default_value = "cluster.yaml")]
    pub cluster: std::path::PathBuf,

    /// Directory holding `plugins/`; defaults to the cluster file's directory
    #[arg(short, long)]
    pub assets_dir: Option<std::path::PathBuf>,
}

impl ClusterArgs {
    pub fn assets_dir(&self) -> std::path::PathBuf {
        self.assets_dir.clone().unwrap_or_else(|| {
            self.cluster
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."))
        })
    }
}
