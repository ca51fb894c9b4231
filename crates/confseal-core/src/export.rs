//! Serialization of a resolved configuration
//!
//! The exporter only sees `ResolvedConfig`, never raw source values, so an
//! indirection marker cannot leak through it. Redaction is applied to every
//! entry before it is written, in every format. No I/O happens here; callers
//! decide where the bytes go.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::redact::{RedactionPolicy, REDACTED};
use crate::resolver::{FailureReport, ResolvedConfig};

/// Errors raised while serializing an export
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Key '{key}' collides with the `_value` member of its parent")]
    KeyConflict { key: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Flat `key=value` lines
    Properties,
    /// Nested key tree
    #[default]
    Json,
    /// Nested key tree
    Yaml,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Properties => "properties",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }

    /// MIME type for HTTP responses
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Properties => "text/plain; charset=utf-8",
            ExportFormat::Json => "application/json",
            ExportFormat::Yaml => "application/yaml",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Properties => "properties",
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "properties" | "props" | "text" => Ok(ExportFormat::Properties),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct TreeDocument {
    properties: Value,
    unresolved: Vec<FailureReport>,
}

/// Writes resolved configurations in the supported formats
///
/// # Example
///
/// ```
/// use confseal_core::export::{ExportFormat, Exporter};
/// use confseal_core::redact::RedactionPolicy;
/// use confseal_core::resolver::{MarkerKind, ResolvedConfig, ResolvedProperty};
///
/// let resolved = ResolvedConfig::new()
///     .with_property("db.user", ResolvedProperty::new("root", "base", MarkerKind::Literal))
///     .with_property("db.password", ResolvedProperty::new("hunter2", "base", MarkerKind::Cipher));
/// let policy = RedactionPolicy::from_patterns(["*.password"]).unwrap();
///
/// let bytes = Exporter::new().export(&resolved, ExportFormat::Properties, &policy).unwrap();
/// let text = String::from_utf8(bytes).unwrap();
/// assert!(text.contains("db.password=***REDACTED***"));
/// assert!(text.contains("db.user=root"));
/// ```
#[derive(Debug, Clone)]
pub struct Exporter {
    header: String,
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            header: "confseal export".to_string(),
        }
    }

    /// Text of the leading comment line in `Properties` output
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }

    /// Serialize `resolved` in `format`, hiding every key matching `policy`
    pub fn export(
        &self,
        resolved: &ResolvedConfig,
        format: ExportFormat,
        policy: &RedactionPolicy,
    ) -> ExportResult<Vec<u8>> {
        match format {
            ExportFormat::Properties => Ok(self.to_properties(resolved, policy).into_bytes()),
            ExportFormat::Json => {
                let document = tree_document(resolved, policy)?;
                let mut bytes = serde_json::to_vec_pretty(&document)
                    .map_err(|e| ExportError::Serialization(e.to_string()))?;
                bytes.push(b'\n');
                Ok(bytes)
            }
            ExportFormat::Yaml => {
                let document = tree_document(resolved, policy)?;
                serde_yaml::to_string(&document)
                    .map(String::into_bytes)
                    .map_err(|e| ExportError::Serialization(e.to_string()))
            }
        }
    }

    /// Export using a format name such as `"yaml"` or `"props"`
    pub fn export_named(
        &self,
        resolved: &ResolvedConfig,
        format: &str,
        policy: &RedactionPolicy,
    ) -> ExportResult<Vec<u8>> {
        self.export(resolved, format.parse()?, policy)
    }

    fn to_properties(&self, resolved: &ResolvedConfig, policy: &RedactionPolicy) -> String {
        let mut out = String::new();
        out.push_str("# ");
        out.push_str(&self.header.replace(['\r', '\n'], " "));
        out.push('\n');

        for (key, property) in resolved.entries() {
            out.push_str(&escape_key(key));
            out.push('=');
            out.push_str(&escape_value(policy.apply(key, property.value())));
            out.push('\n');
        }

        for failure in resolved.failures() {
            let report = failure.report();
            let line = format!("# unresolved: {} ({}): {}", report.key, report.source, report.reason);
            out.push_str(&line.replace(['\r', '\n'], " "));
            out.push('\n');
        }
        out
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

fn tree_document(resolved: &ResolvedConfig, policy: &RedactionPolicy) -> ExportResult<TreeDocument> {
    Ok(TreeDocument {
        properties: build_tree(resolved, policy)?,
        unresolved: resolved.failures().iter().map(|f| f.report()).collect(),
    })
}

/// Member that holds a key's own value once other keys nest below it
pub const LEAF_VALUE_KEY: &str = "_value";

/// Nest dotted keys into objects; `a.b.c` becomes `{a: {b: {c: ..}}}`
///
/// When `a.b` and `a.b.c` both exist, `a.b` becomes
/// `{_value: .., c: ..}`.
fn build_tree(resolved: &ResolvedConfig, policy: &RedactionPolicy) -> ExportResult<Value> {
    let mut root = Map::new();

    for (key, property) in resolved.entries() {
        let value = if policy.is_redacted(key) {
            REDACTED.to_string()
        } else {
            property.value().to_string()
        };

        let conflict = || ExportError::KeyConflict { key: key.to_string() };
        let mut segments: Vec<&str> = key.split('.').collect();
        let leaf = segments.pop().unwrap_or_default();

        let mut node = &mut root;
        for segment in segments {
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if child.is_string() {
                let own = child.take();
                let mut branch = Map::new();
                branch.insert(LEAF_VALUE_KEY.to_string(), own);
                *child = Value::Object(branch);
            }
            node = match child {
                Value::Object(map) => map,
                _ => return Err(conflict()),
            };
        }

        match node.get_mut(leaf) {
            None => {
                node.insert(leaf.to_string(), Value::String(value));
            }
            Some(Value::Object(branch)) if !branch.contains_key(LEAF_VALUE_KEY) => {
                branch.insert(LEAF_VALUE_KEY.to_string(), Value::String(value));
            }
            Some(_) => return Err(conflict()),
        }
    }

    Ok(Value::Object(root))
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '=' | ':' | ' ' | '#' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => push_escaped_control(&mut out, c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            ' ' if i == 0 => out.push_str("\\ "),
            _ => push_escaped_control(&mut out, c),
        }
    }
    out
}

fn push_escaped_control(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        _ => out.push(c),
    }
}
