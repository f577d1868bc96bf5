//! Rendering of templated plugin values.

use serde_json::Value;
use tracing::trace;

use forge_api::Values;

use crate::engine::{RenderContext, TemplateEngine};
use crate::error::{TemplateError, TemplateResult};

/// Render every string leaf of `values` that contains template syntax.
///
/// Templates see the caller context and the unrendered `values` under
/// `Values`. Strings without template syntax, and non-string leaves, are left
/// untouched, so rendering already-rendered values yields the same result.
pub fn render_values(
    engine: &TemplateEngine,
    plugin: &str,
    values: &Values,
    ctx: &RenderContext,
) -> TemplateResult<Values> {
    let data = ctx.with_values(values);
    let mut out = Values::new();
    for (key, value) in values {
        out.insert(key.clone(), render_value(engine, plugin, key, value, &data)?);
    }
    Ok(out)
}

fn render_value(
    engine: &TemplateEngine,
    plugin: &str,
    path: &str,
    value: &Value,
    data: &Value,
) -> TemplateResult<Value> {
    match value {
        Value::String(s) if TemplateEngine::looks_like_template(s) => {
            trace!("Rendering value {} of plugin {}", path, plugin);
            let rendered = engine.render(s, data).map_err(|e| TemplateError::Render {
                plugin: plugin.to_string(),
                path: path.to_string(),
                message: e.to_string(),
            })?;
            Ok(Value::String(rendered))
        }
        Value::Object(map) => {
            let mut out = Values::new();
            for (key, child) in map {
                let child_path = format!("{}.{}", path, key);
                out.insert(key.clone(), render_value(engine, plugin, &child_path, child, data)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| render_value(engine, plugin, &format!("{}[{}]", path, i), item, data))
            .collect::<TemplateResult<Vec<_>>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}
