//! Detection of deferred cloud-provider expressions in rendered text.
//!
//! A deferred expression is a JSON object with a single `Ref` or `Fn::*` key,
//! e.g. `{"Ref": "Queue"}` or `{"Fn::GetAtt": ["Queue", "Arn"]}`. Such objects
//! can only be evaluated when the stack is deployed, so text containing them
//! is emitted as a join of literal and expression tokens.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Deserializer, Value};
use tracing::trace;

use forge_api::ContentKind;

use crate::error::{TemplateError, TemplateResult};

static EXPRESSION_START: OnceLock<Regex> = OnceLock::new();

fn expression_start() -> &'static Regex {
    EXPRESSION_START.get_or_init(|| {
        Regex::new(r#"\{\s*"(?:Ref|Fn::[A-Za-z0-9]+)"\s*:"#).expect("constant expression pattern")
    })
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of classifying a piece of rendered text.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Text that can be emitted as is.
    Literal(String),
    /// A structured expression that concatenates literals and deferred values.
    Deferred(Value),
}

impl Classified {
    pub fn is_literal(&self) -> bool {
        matches!(self, Classified::Literal(_))
    }

    /// JSON form suitable for embedding in a generated document.
    pub fn into_value(self) -> Value {
        match self {
            Classified::Literal(s) => Value::String(s),
            Classified::Deferred(v) => v,
        }
    }
}

/// Splits text into literal and expression tokens.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    expression_start: &'static Regex,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            expression_start: expression_start(),
        }
    }

    /// Split `text` into tokens.
    ///
    /// Literal runs become JSON strings and expressions stay JSON objects.
    /// Empty text yields no tokens.
    pub fn tokenize(&self, text: &str) -> Vec<Value> {
        let mut tokens = Vec::new();
        let mut literal_start = 0;
        let mut pos = 0;

        while let Some(m) = self.expression_start.find_at(text, pos) {
            let start = m.start();
            match parse_expression(&text[start..]) {
                Some((expr, len)) => {
                    if start > literal_start {
                        tokens.push(Value::String(text[literal_start..start].to_string()));
                    }
                    tokens.push(expr);
                    literal_start = start + len;
                    pos = literal_start;
                }
                None => pos = m.end(),
            }
        }

        if literal_start < text.len() {
            tokens.push(Value::String(text[literal_start..].to_string()));
        }
        tokens
    }

    /// Classify rendered text of the given kind.
    ///
    /// Credential and binary content is never inspected. Otherwise text
    /// without expressions stays a literal and anything else becomes
    /// `{"Fn::Join": ["", tokens]}`.
    pub fn classify(&self, text: &str, kind: ContentKind) -> TemplateResult<Classified> {
        if matches!(kind, ContentKind::Credential | ContentKind::Binary) {
            return Ok(Classified::Literal(text.to_string()));
        }

        let mut tokens = self.tokenize(text);
        trace!("Classified text into {} token(s)", tokens.len());
        match tokens.len() {
            0 => Ok(Classified::Literal(text.to_string())),
            1 => {
                let token = tokens.remove(0);
                let literal = serde_json::from_value::<String>(token.clone()).map_err(|e| {
                    TemplateError::TokenDecode {
                        token: token.to_string(),
                        message: e.to_string(),
                    }
                })?;
                Ok(Classified::Literal(literal))
            }
            _ => Ok(Classified::Deferred(json!({ "Fn::Join": ["", tokens] }))),
        }
    }
}

/// Whether `value` is a single-key `Ref` / `Fn::*` object.
pub fn is_expression(value: &Value) -> bool {
    match value.as_object() {
        Some(map) if map.len() == 1 => map
            .keys()
            .all(|k| k == "Ref" || k.starts_with("Fn::")),
        _ => false,
    }
}

fn parse_expression(text: &str) -> Option<(Value, usize)> {
    let mut stream = Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value)) if is_expression(&value) => Some((value, stream.byte_offset())),
        _ => None,
    }
}
