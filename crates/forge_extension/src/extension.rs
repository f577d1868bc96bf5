//! The composition entry point shared by every aggregator.

use std::sync::Arc;

use forge_api::{merge_values, ContentKind, Plugin, PluginConfig, PluginList, Values};
use forge_templates::{
    render_values, AssetLoader, Classified, ContentResolver, RenderContext, TemplateEngine,
    TemplateResult, Tokenizer,
};

use crate::error::{CompositionError, ExtensionResult, PluginError};
use crate::observer::{CompositionObserver, TracingObserver};
use crate::registry::Enablement;

/// Composes the contributions of enabled plugins into cluster artifacts.
///
/// Plugins are visited in [`PluginList`] order, so when two plugins write the
/// same key the later one wins. Every entry point builds its output from
/// scratch and leaves the extension untouched.
pub struct ClusterExtension<'a> {
    plugins: &'a PluginList,
    enablement: &'a Enablement,
    loader: &'a AssetLoader,
    engine: TemplateEngine,
    tokenizer: Tokenizer,
    observer: Arc<dyn CompositionObserver>,
}

impl<'a> ClusterExtension<'a> {
    pub fn new(
        plugins: &'a PluginList,
        enablement: &'a Enablement,
        loader: &'a AssetLoader,
    ) -> Self {
        Self {
            plugins,
            enablement,
            loader,
            engine: TemplateEngine::new(),
            tokenizer: Tokenizer::new(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn CompositionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn plugins(&self) -> &PluginList {
        self.plugins
    }

    pub fn enablement(&self) -> &Enablement {
        self.enablement
    }

    pub(crate) fn observer(&self) -> &dyn CompositionObserver {
        self.observer.as_ref()
    }

    /// Run `f` for every enabled plugin in load order.
    ///
    /// `f` returns the number of items the plugin contributed. The first
    /// failure stops the walk and is attributed to the plugin and `artifact`.
    pub(crate) fn for_each_enabled<F>(&self, artifact: &str, mut f: F) -> ExtensionResult<()>
    where
        F: FnMut(&Plugin, &PluginConfig) -> Result<usize, PluginError>,
    {
        for plugin in self.plugins {
            let Some(config) = self.enablement.enabled_config(plugin) else {
                self.observer.plugin_skipped(plugin.name(), artifact);
                continue;
            };

            let contributed = f(plugin, config).map_err(|source| CompositionError::Plugin {
                plugin: plugin.name().to_string(),
                artifact: artifact.to_string(),
                source,
            })?;
            self.observer
                .plugin_contributed(plugin.name(), artifact, contributed);
        }
        Ok(())
    }

    /// Plugin defaults merged with the user's config, then rendered.
    pub(crate) fn plugin_values(
        &self,
        plugin: &Plugin,
        config: &PluginConfig,
        ctx: &RenderContext,
    ) -> Result<Values, PluginError> {
        let merged = merge_values(plugin.default_values(), &config.values)?;
        Ok(render_values(&self.engine, plugin.name(), &merged, ctx)?)
    }

    pub(crate) fn resolver<'r>(
        &'r self,
        plugin: &'r Plugin,
        ctx: &RenderContext,
        values: &Values,
    ) -> ContentResolver<'r> {
        ContentResolver::new(plugin.name(), &self.engine, self.loader, ctx, values)
    }

    pub(crate) fn classify(&self, text: &str, kind: ContentKind) -> TemplateResult<Classified> {
        self.tokenizer.classify(text, kind)
    }
}
