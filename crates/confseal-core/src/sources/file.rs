//! File-based property sources
//!
//! Supported formats, picked by file extension:
//! - `.properties`: `key=value` / `key: value` lines, `#` and `!` comments
//! - `.yaml` / `.yml`: nested mappings flattened to dotted keys
//! - `.json`: same flattening as YAML
//!
//! Sequences flatten to indexed keys (`servers[0]`, `servers[1]`), nulls to
//! the empty string.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::source::PropertySource;
use super::traits::{SourceError, SourceLoader, SourceResult};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::log_debug;

/// Declaration of one file-backed source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Unique source name
    pub name: String,
    /// Lower number wins
    pub priority: i32,
    /// File to read
    pub path: PathBuf,
    /// Treat a missing file as an empty source instead of an error
    #[serde(default)]
    pub optional: bool,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, priority: i32, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            priority,
            path: path.into(),
            optional: false,
        }
    }

    /// Mark the file as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Loads property sources from files on disk
///
/// # Example
///
/// ```no_run
/// use confseal_core::sources::{FileSourceLoader, SourceSpec, SourceLoader};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let loader = FileSourceLoader::new(vec![
///     SourceSpec::new("override", 0, "config/override.yml"),
///     SourceSpec::new("base", 1, "config/application.properties"),
/// ]);
/// let sources = loader.load().await?;
/// # Ok(())
/// # }
/// ```
pub struct FileSourceLoader {
    specs: Vec<SourceSpec>,
    base_dir: Option<PathBuf>,
    logger: SharedLogger,
}

impl FileSourceLoader {
    /// Create a loader for the given source declarations
    pub fn new(specs: Vec<SourceSpec>) -> Self {
        Self {
            specs,
            base_dir: None,
            logger: NoOpLogger::shared(),
        }
    }

    /// Resolve relative paths against `dir` instead of the working directory
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn specs(&self) -> &[SourceSpec] {
        &self.specs
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Load a single declared source
    pub fn load_spec(&self, spec: &SourceSpec) -> SourceResult<PropertySource> {
        let path = self.full_path(&spec.path);
        let origin = path.display().to_string();

        if spec.optional && !path.exists() {
            log_debug!(self.logger, "Optional source '{}' missing at {}", spec.name, origin);
            return Ok(PropertySource::new(&spec.name, spec.priority).with_origin(origin));
        }

        let properties = load_file(&path)?;
        log_debug!(
            self.logger,
            "Loaded source '{}' from {} ({} keys)",
            spec.name,
            origin,
            properties.len()
        );

        Ok(PropertySource::from_map(&spec.name, spec.priority, properties).with_origin(origin))
    }
}

impl std::fmt::Debug for FileSourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSourceLoader")
            .field("specs", &self.specs)
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

#[async_trait]
impl SourceLoader for FileSourceLoader {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> SourceResult<Vec<PropertySource>> {
        self.specs.iter().map(|spec| self.load_spec(spec)).collect()
    }
}

/// Read and flatten a single file
pub fn load_file(path: &Path) -> SourceResult<BTreeMap<String, String>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let content = fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    match extension.as_deref() {
        Some("properties") => Ok(parse_properties(&content)),
        Some("yaml") | Some("yml") => parse_yaml(&content).map_err(|message| SourceError::Parse {
            path: path.to_path_buf(),
            message,
        }),
        Some("json") => parse_json(&content).map_err(|message| SourceError::Parse {
            path: path.to_path_buf(),
            message,
        }),
        _ => Err(SourceError::UnsupportedFileType(path.to_path_buf())),
    }
}

/// Parse `.properties` text
///
/// Handles `=` and `:` separators, `#`/`!` comments, backslash line
/// continuations and the common escapes (`\n`, `\t`, `\\`, `\=`, `\:`).
pub fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut logical = String::new();

    for raw_line in content.lines() {
        // Continuation lines drop their leading whitespace too
        let line = raw_line.trim_start();

        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }

        logical.push_str(line);
        if let Some((key, value)) = split_property(&logical) {
            properties.insert(key, value);
        }
        logical.clear();
    }

    if !logical.is_empty() {
        if let Some((key, value)) = split_property(&logical) {
            properties.insert(key, value);
        }
    }

    properties
}

fn ends_with_continuation(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

fn split_property(line: &str) -> Option<(String, String)> {
    let mut escaped = false;
    let mut split_at = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                split_at = Some(i);
                break;
            }
            _ => {}
        }
    }

    let (key, value) = match split_at {
        Some(i) => (&line[..i], &line[i + 1..]),
        None => (line, ""),
    };

    let key = unescape(key.trim());
    if key.is_empty() {
        return None;
    }
    Some((key, unescape(value.trim_start())))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Parse YAML text into flattened properties
pub fn parse_yaml(content: &str) -> Result<BTreeMap<String, String>, String> {
    let value: serde_yaml::Value = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let mut properties = BTreeMap::new();
    flatten_yaml("", &value, &mut properties)?;
    Ok(properties)
}

fn flatten_yaml(
    prefix: &str,
    value: &serde_yaml::Value,
    out: &mut BTreeMap<String, String>,
) -> Result<(), String> {
    use serde_yaml::Value;

    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = match key {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key: {:?}", other)),
                };
                flatten_yaml(&join_key(prefix, &key), child, out)?;
            }
        }
        Value::Sequence(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_yaml(&format!("{}[{}]", prefix, i), child, out)?;
            }
        }
        Value::Tagged(tagged) => flatten_yaml(prefix, &tagged.value, out)?,
        Value::Null => insert_leaf(prefix, String::new(), out),
        Value::Bool(b) => insert_leaf(prefix, b.to_string(), out),
        Value::Number(n) => insert_leaf(prefix, n.to_string(), out),
        Value::String(s) => insert_leaf(prefix, s.clone(), out),
    }
    Ok(())
}

/// Parse JSON text into flattened properties
pub fn parse_json(content: &str) -> Result<BTreeMap<String, String>, String> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let mut properties = BTreeMap::new();
    flatten_json("", &value, &mut properties);
    Ok(properties)
}

fn flatten_json(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, String>) {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_json(&join_key(prefix, key), child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_json(&format!("{}[{}]", prefix, i), child, out);
            }
        }
        Value::Null => insert_leaf(prefix, String::new(), out),
        Value::Bool(b) => insert_leaf(prefix, b.to_string(), out),
        Value::Number(n) => insert_leaf(prefix, n.to_string(), out),
        Value::String(s) => insert_leaf(prefix, s.clone(), out),
    }
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn insert_leaf(key: &str, value: String, out: &mut BTreeMap<String, String>) {
    // A bare scalar document has no key to attach to
    if !key.is_empty() {
        out.insert(key.to_string(), value);
    }
}
