//! Resolution of content specs to rendered text.

use serde_json::Value;
use tracing::debug;

use forge_api::values::kind_of;
use forge_api::{ContentSpec, Values};

use crate::engine::{RenderContext, TemplateEngine};
use crate::error::{TemplateError, TemplateResult};
use crate::loader::AssetLoader;

/// Content after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedContent {
    Text(String),
    /// Opaque bytes of `binary` content, never rendered.
    Binary(Vec<u8>),
}

/// Resolves and renders content for one plugin.
///
/// The resolver is bound to the plugin's merged and rendered values and to the
/// caller's render context; every template it renders sees both.
pub struct ContentResolver<'a> {
    plugin: &'a str,
    engine: &'a TemplateEngine,
    loader: &'a AssetLoader,
    data: Value,
}

impl<'a> ContentResolver<'a> {
    pub fn new(
        plugin: &'a str,
        engine: &'a TemplateEngine,
        loader: &'a AssetLoader,
        ctx: &RenderContext,
        values: &Values,
    ) -> Self {
        Self {
            plugin,
            engine,
            loader,
            data: ctx.with_values(values),
        }
    }

    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// Resolve `spec`: inline content if present, else the plugin asset.
    ///
    /// `what` names the content in errors, e.g. `files[/etc/foo]`.
    pub fn resolve(&self, spec: &ContentSpec, what: &str) -> TemplateResult<ResolvedContent> {
        let raw = match (spec.content.as_deref(), spec.source_path()) {
            (Some(inline), _) if !inline.is_empty() => inline.as_bytes().to_vec(),
            (_, Some(path)) => self.loader.load(self.plugin, path)?,
            _ => Vec::new(),
        };

        if spec.is_binary() {
            debug!("Resolved {} bytes of binary {} for {}", raw.len(), what, self.plugin);
            return Ok(ResolvedContent::Binary(raw));
        }

        let text = String::from_utf8(raw).map_err(|_| TemplateError::NotUtf8 {
            plugin: self.plugin.to_string(),
            what: what.to_string(),
        })?;
        Ok(ResolvedContent::Text(self.render(&text, what)?))
    }

    /// Resolve `spec` as text; binary content is an error.
    pub fn text(&self, spec: &ContentSpec, what: &str) -> TemplateResult<String> {
        match self.resolve(spec, what)? {
            ResolvedContent::Text(s) => Ok(s),
            ResolvedContent::Binary(_) => Err(TemplateError::BinaryAsText {
                plugin: self.plugin.to_string(),
                what: what.to_string(),
            }),
        }
    }

    /// Render a single template string.
    pub fn string(&self, template: &str, what: &str) -> TemplateResult<String> {
        self.render(template, what)
    }

    /// Resolve `spec` and parse it as a JSON object.
    ///
    /// Empty content yields an empty map.
    pub fn json_map(&self, spec: &ContentSpec, what: &str) -> TemplateResult<Values> {
        if spec.is_empty() {
            return Ok(Values::new());
        }
        let text = self.text(spec, what)?;
        if text.trim().is_empty() {
            return Ok(Values::new());
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(TemplateError::NotAnObject {
                plugin: self.plugin.to_string(),
                what: what.to_string(),
                found: kind_of(&other),
            }),
        }
    }

    fn render(&self, text: &str, what: &str) -> TemplateResult<String> {
        if !TemplateEngine::looks_like_template(text) {
            return Ok(text.to_string());
        }
        self.engine
            .render(text, &self.data)
            .map_err(|e| TemplateError::Render {
                plugin: self.plugin.to_string(),
                path: what.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_api::{ContentKind, PLUGINS_DIR};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_asset(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(PLUGINS_DIR).join("p").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn values() -> Values {
        json!({"queue": {"name": "bar"}}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_inline_content_is_rendered() {
        let engine = TemplateEngine::new();
        let loader = AssetLoader::new("/nowhere");
        let ctx = RenderContext::from_value(json!({"clusterName": "demo"}));
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        let spec = ContentSpec::inline("{{ clusterName }}/{{ Values.queue.name }}");
        assert_eq!(resolver.text(&spec, "x").unwrap(), "demo/bar");
    }

    #[test]
    fn test_source_content_is_loaded_and_rendered() {
        let temp = tempdir().unwrap();
        write_asset(temp.path(), "assets/unit", b"name={{ Values.queue.name }}\n");

        let engine = TemplateEngine::new();
        let loader = AssetLoader::new(temp.path());
        let ctx = RenderContext::new();
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        let spec = ContentSpec::from_source("assets/unit");
        assert_eq!(resolver.text(&spec, "x").unwrap(), "name=bar\n");
    }

    #[test]
    fn test_binary_is_not_rendered() {
        let temp = tempdir().unwrap();
        write_asset(temp.path(), "bin/tool", b"\x00\x01{{ nope }}");

        let engine = TemplateEngine::new();
        let loader = AssetLoader::new(temp.path());
        let ctx = RenderContext::new();
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        let spec = ContentSpec::from_source("bin/tool").with_kind(ContentKind::Binary);
        assert_eq!(
            resolver.resolve(&spec, "x").unwrap(),
            ResolvedContent::Binary(b"\x00\x01{{ nope }}".to_vec())
        );
        assert!(matches!(
            resolver.text(&spec, "x"),
            Err(TemplateError::BinaryAsText { .. })
        ));
    }

    #[test]
    fn test_render_error_names_content() {
        let engine = TemplateEngine::new();
        let loader = AssetLoader::new("/nowhere");
        let ctx = RenderContext::new();
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        let err = resolver
            .text(&ContentSpec::inline("{{ missing }}"), "files[/etc/x]")
            .unwrap_err();
        assert!(err.to_string().contains("files[/etc/x]"));
    }

    #[test]
    fn test_json_map() {
        let engine = TemplateEngine::new();
        let loader = AssetLoader::new("/nowhere");
        let ctx = RenderContext::new();
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        let spec = ContentSpec::inline(r#"{"Queue": {"Properties": {"QueueName": "{{ Values.queue.name }}"}}}"#);
        let map = resolver.json_map(&spec, "resources").unwrap();
        assert_eq!(map["Queue"]["Properties"]["QueueName"], "bar");

        assert!(resolver.json_map(&ContentSpec::default(), "outputs").unwrap().is_empty());
        assert!(resolver.json_map(&ContentSpec::inline("  \n"), "tags").unwrap().is_empty());

        let err = resolver.json_map(&ContentSpec::inline("[1]"), "tags").unwrap_err();
        assert!(matches!(err, TemplateError::NotAnObject { found: "a list", .. }));
    }

    #[test]
    fn test_string_passthrough() {
        let engine = TemplateEngine::new();
        let loader = AssetLoader::new("/nowhere");
        let ctx = RenderContext::new();
        let resolver = ContentResolver::new("p", &engine, &loader, &ctx, &values());

        assert_eq!(resolver.string("--flag", "f").unwrap(), "--flag");
        assert_eq!(resolver.string("{{ Values.queue.name }}", "f").unwrap(), "bar");
    }
}
