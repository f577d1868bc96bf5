//! Content specifications shared by files, units, manifests and stack fragments.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// How a piece of content is treated during composition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Rendered, then classified as literal or deferred.
    #[default]
    #[serde(alias = "")]
    Regular,
    /// Rendered but never turned into a deferred expression.
    Credential,
    /// Never rendered; delivered out of band as an archive.
    Binary,
    /// Kubernetes manifest or config-set content.
    #[serde(alias = "configset")]
    Manifest,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Regular => "regular",
            ContentKind::Credential => "credential",
            ContentKind::Binary => "binary",
            ContentKind::Manifest => "manifest",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Location of plugin-relative content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContentSource {
    /// Path relative to the plugin's own directory.
    #[serde(default)]
    pub path: String,
}

/// Inline content or a pointer to a plugin asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ContentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ContentSource>,
    #[serde(default, rename = "type", alias = "kind")]
    pub kind: ContentKind,
}

impl ContentSpec {
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn from_source(path: impl Into<String>) -> Self {
        Self {
            source: Some(ContentSource { path: path.into() }),
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Plugin-relative source path, if the spec points at a non-empty one.
    pub fn source_path(&self) -> Option<&str> {
        self.source
            .as_ref()
            .map(|s| s.path.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Whether the spec carries neither inline content nor a source path.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, str::is_empty) && self.source_path().is_none()
    }

    pub fn is_binary(&self) -> bool {
        self.kind == ContentKind::Binary
    }
}

/// A file to place on a machine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FileSpec {
    /// Destination path on the machine.
    pub path: String,
    #[serde(default = "default_permissions", deserialize_with = "deserialize_permissions")]
    pub permissions: u32,
    #[serde(flatten)]
    pub content: ContentSpec,
}

impl FileSpec {
    pub fn new(path: impl Into<String>, permissions: u32, content: ContentSpec) -> Self {
        Self {
            path: path.into(),
            permissions,
            content,
        }
    }
}

fn default_permissions() -> u32 {
    0o644
}

/// Accept `0644` / `"0644"` as octal, and plain integers as given.
///
/// YAML 1.2 reads a leading-zero scalar like `0644` as a string, which is what
/// plugin authors write for file modes.
pub fn deserialize_permissions<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct PermissionsVisitor;

    impl<'de> Visitor<'de> for PermissionsVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("file permissions as an integer or an octal string such as \"0644\"")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("permissions out of range: {}", v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom(format!("permissions out of range: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            parse_octal(v).ok_or_else(|| E::custom(format!("invalid octal permissions: {:?}", v)))
        }
    }

    deserializer.deserialize_any(PermissionsVisitor)
}

fn parse_octal(s: &str) -> Option<u32> {
    let s = s.trim();
    let digits = s.strip_prefix("0o").unwrap_or(s);
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, 8).ok()
}
