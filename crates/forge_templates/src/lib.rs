//! # forge_templates
//!
//! Rendering of plugin content for kubeforge.
//!
//! Plugin values, files, units and stack fragments may contain Jinja templates.
//! This crate renders them, loads plugin assets from disk, and classifies the
//! rendered text as either a plain literal or a deferred expression that the
//! cloud provider evaluates at deployment time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use forge_api::{ContentKind, ContentSpec, Values};
//! use forge_templates::{AssetLoader, ContentResolver, RenderContext, TemplateEngine, Tokenizer};
//! use serde_json::json;
//!
//! let engine = TemplateEngine::new();
//! let loader = AssetLoader::new("assets");
//! let ctx = RenderContext::from_value(json!({"clusterName": "demo"}));
//! let values = Values::new();
//!
//! let resolver = ContentResolver::new("my-plugin", &engine, &loader, &ctx, &values);
//! let text = resolver.text(&ContentSpec::inline("name={{ clusterName }}"), "example").unwrap();
//!
//! let tokenizer = Tokenizer::new();
//! let classified = tokenizer.classify(&text, ContentKind::Regular).unwrap();
//! assert!(classified.is_literal());
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod tokens;
pub mod values;

pub use engine::{RenderContext, TemplateEngine, VALUES_KEY};
pub use error::{TemplateError, TemplateResult};
pub use loader::AssetLoader;
pub use resolver::{ContentResolver, ResolvedContent};
pub use tokens::{is_expression, Classified, Tokenizer};
pub use values::render_values;
