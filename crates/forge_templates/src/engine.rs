//! Template engine used for every piece of plugin content.
//!
//! Templates use Jinja syntax through minijinja. Undefined lookups are errors
//! so that a typo in a plugin fails the build instead of silently rendering an
//! empty string.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;
use serde_json::Map;

use forge_api::Values;

/// Markers that make a string a template.
const TEMPLATE_MARKERS: [&str; 3] = ["{{", "{%", "{#"];

/// Key under which a plugin's merged values are exposed to templates.
pub const VALUES_KEY: &str = "Values";

/// Wrapper around a configured minijinja environment.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with strict undefined handling and the plugin filters.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_filter("quote", quote);
        env.add_function("quote", quote);
        env.add_filter("b64enc", b64enc);
        Self { env }
    }

    /// Whether `s` contains template syntax.
    pub fn looks_like_template(s: &str) -> bool {
        TEMPLATE_MARKERS.iter().any(|m| s.contains(m))
    }

    /// Render `source` against `ctx`.
    pub fn render<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.render_str(source, ctx)
    }
}

/// Caller-supplied data visible to templates.
///
/// The context's top-level keys are exposed as template globals, next to the
/// plugin's merged values under `Values`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    fields: Map<String, serde_json::Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON value.
    ///
    /// Objects contribute their keys; any other value is exposed as `Context`.
    pub fn from_value(value: serde_json::Value) -> Self {
        let fields = match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("Context".to_string(), other);
                map
            }
        };
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }

    /// The object templates are rendered against.
    pub fn with_values(&self, values: &Values) -> serde_json::Value {
        let mut map = self.fields.clone();
        map.insert(VALUES_KEY.to_string(), serde_json::Value::Object(values.clone()));
        serde_json::Value::Object(map)
    }
}

impl From<serde_json::Value> for RenderContext {
    fn from(value: serde_json::Value) -> Self {
        Self::from_value(value)
    }
}

fn quote(value: Value) -> String {
    let s = match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    };
    serde_json::Value::String(s).to_string()
}

fn b64enc(value: String) -> String {
    BASE64_STANDARD.encode(value)
}
