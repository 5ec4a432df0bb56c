//! Layered project configuration.
//!
//! Precedence, lowest first: built-in defaults, `.scope-advisor/config.yml` (shared),
//! `.scope-advisor/config.local.yml` (machine-local), then `SCOPE_CONFIG__*` environment
//! variables whose double-underscore segments name a nested key.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::debug;

use super::ConfigError;
use crate::scope::ScopeConfig;

pub const CONFIG_DIR: &str = ".scope-advisor";
pub const PROJECT_CONFIG_FILE: &str = "config.yml";
pub const LOCAL_CONFIG_FILE: &str = "config.local.yml";
pub const ENV_PREFIX: &str = "SCOPE_CONFIG__";

const SCOPE_SECTION: &str = "scope_detection";

/// Fully merged project settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    values: Value,
    sources: Vec<PathBuf>,
}

impl ProjectConfig {
    pub fn defaults() -> Value {
        json!({
            "schema_version": 1,
            "scope_detection": {},
        })
    }

    /// Merge every layer under `root`; `env` is usually [`std::env::vars`].
    pub fn load<I, K, V>(root: impl AsRef<Path>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let dir = root.as_ref().join(CONFIG_DIR);
        let mut values = Self::defaults();
        let mut sources = Vec::new();

        for path in [dir.join(PROJECT_CONFIG_FILE), dir.join(LOCAL_CONFIG_FILE)] {
            if let Some(layer) = read_layer(&path)? {
                deep_merge(&mut values, layer);
                sources.push(path);
            }
        }

        let overrides = env_overrides(env);
        if !overrides.is_empty() {
            deep_merge(&mut values, Value::Object(overrides));
        }

        debug!(sources = sources.len(), "project configuration loaded");
        Ok(Self { values, sources })
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Files that contributed a layer, lowest precedence first.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Value at a dotted path such as `scope_detection.keyword_cap`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.values, |cursor, segment| cursor.get(segment))
    }

    /// Scoring configuration built from the merged `scope_detection` section.
    pub fn scope_config(&self) -> Result<ScopeConfig, ConfigError> {
        match self.values.get(SCOPE_SECTION) {
            Some(section) => Ok(ScopeConfig::from_mapping(section)?),
            None => Ok(ScopeConfig::default()),
        }
    }
}

fn read_layer(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Some(Value::Object(Map::new())));
    }

    let parsed: Value = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    match parsed {
        Value::Object(_) => Ok(Some(parsed)),
        Value::Null => Ok(Some(Value::Object(Map::new()))),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Recursively merge `overlay` into `base`; non-mapping values replace what they land on.
fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if let Some(existing) = base.get_mut(&key) {
                    if existing.is_object() && value.is_object() {
                        deep_merge(existing, value);
                        continue;
                    }
                }
                base.insert(key, value);
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn env_overrides<I, K, V>(env: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut overrides = Map::new();

    for (key, raw) in env {
        let Some(remainder) = key.as_ref().strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = remainder
            .split("__")
            .map(|segment| segment.trim().to_ascii_lowercase())
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            continue;
        }

        set_nested(&mut overrides, &segments, parse_env_value(raw.as_ref()));
    }

    overrides
}

/// YAML scalar, sequence, or mapping when the text parses; the raw string otherwise.
fn parse_env_value(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn set_nested(target: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_nested(child, rest, value);
            }
        }
    }
}
