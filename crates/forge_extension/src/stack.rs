//! Aggregation of cloud stack fragments.

use std::fmt;

use serde::Serialize;

use forge_api::{StackSpec, Stacks, Values};
use forge_templates::RenderContext;

use crate::error::ExtensionResult;
use crate::extension::ClusterExtension;

/// The stack layers plugins can contribute to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackLayer {
    Root,
    Network,
    Etcd,
    ControlPlane,
    NodePool,
}

impl StackLayer {
    pub const ALL: [StackLayer; 5] = [
        StackLayer::Root,
        StackLayer::Network,
        StackLayer::Etcd,
        StackLayer::ControlPlane,
        StackLayer::NodePool,
    ];

    /// The part of a plugin's stack specs this layer reads.
    pub fn select(self, stacks: &Stacks) -> &StackSpec {
        match self {
            StackLayer::Root => &stacks.root,
            StackLayer::Network => &stacks.network,
            StackLayer::Etcd => &stacks.etcd,
            StackLayer::ControlPlane => &stacks.control_plane,
            StackLayer::NodePool => &stacks.node_pool,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StackLayer::Root => "root",
            StackLayer::Network => "network",
            StackLayer::Etcd => "etcd",
            StackLayer::ControlPlane => "controlPlane",
            StackLayer::NodePool => "nodePool",
        }
    }
}

impl fmt::Display for StackLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} stack", self.name())
    }
}

/// Resources, outputs and tags contributed to one stack layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StackFragment {
    pub resources: Values,
    pub outputs: Values,
    pub tags: Values,
}

impl StackFragment {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty() && self.tags.is_empty()
    }

    fn extend(&mut self, other: StackFragment) -> usize {
        let count = other.resources.len() + other.outputs.len() + other.tags.len();
        self.resources.extend(other.resources);
        self.outputs.extend(other.outputs);
        self.tags.extend(other.tags);
        count
    }
}

impl ClusterExtension<'_> {
    /// Compose the fragment for `layer`.
    ///
    /// Plugin values are rendered against `values_ctx`; the fragments
    /// themselves against `render_ctx`.
    pub fn stack(
        &self,
        layer: StackLayer,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        let artifact = layer.to_string();
        let mut fragment = StackFragment::default();

        self.for_each_enabled(&artifact, |plugin, config| {
            let values = self.plugin_values(plugin, config, values_ctx)?;
            let resolver = self.resolver(plugin, render_ctx, &values);
            let spec = layer.select(plugin.stacks());

            let contribution = StackFragment {
                resources: resolver.json_map(&spec.resources, "resources")?,
                outputs: resolver.json_map(&spec.outputs, "outputs")?,
                tags: resolver.json_map(&spec.tags, "tags")?,
            };
            self.observer().resolved(plugin.name(), &artifact);
            Ok(fragment.extend(contribution))
        })?;

        Ok(fragment)
    }

    pub fn root_stack(
        &self,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        self.stack(StackLayer::Root, render_ctx, values_ctx)
    }

    pub fn network_stack(
        &self,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        self.stack(StackLayer::Network, render_ctx, values_ctx)
    }

    pub fn etcd_stack(
        &self,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        self.stack(StackLayer::Etcd, render_ctx, values_ctx)
    }

    pub fn control_plane_stack(
        &self,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        self.stack(StackLayer::ControlPlane, render_ctx, values_ctx)
    }

    pub fn node_pool_stack(
        &self,
        render_ctx: &RenderContext,
        values_ctx: &RenderContext,
    ) -> ExtensionResult<StackFragment> {
        self.stack(StackLayer::NodePool, render_ctx, values_ctx)
    }
}
