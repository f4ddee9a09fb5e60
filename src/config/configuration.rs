//! Flat, case-insensitive key/value configuration
//!
//! Hierarchical sources are flattened into `:`-separated keys:
//!
//! ```json
//! { "logging": { "writeTo": [ { "Name": "File", "Args": { "path": "app.log" } } ] } }
//! ```
//!
//! becomes `logging:writeTo:0:Name = File` and
//! `logging:writeTo:0:Args:path = app.log`. Lookups ignore case; the
//! spelling of the first writer of a key is kept for display.

use super::settings::LogSettings;
use super::substitution::SubstitutionTable;
use crate::core::{LoggerError, Result};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Key path separator
pub const KEY_DELIMITER: &str = ":";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    /// normalized key → (key as written, value)
    entries: BTreeMap<String, (String, String)>,
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::new();
        for (key, value) in pairs {
            config.set(key, value);
        }
        config
    }

    /// Flatten a JSON document; the root must be an object
    pub fn from_json_str(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text)?;
        if !root.is_object() {
            return Err(LoggerError::config(
                "<root>",
                "configuration document must be a JSON object",
            ));
        }
        let mut config = Self::new();
        config.flatten_value("", &root);
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("reading configuration", path.display().to_string(), e)
        })?;
        Self::from_json_str(&text)
    }

    fn flatten_value(&mut self, prefix: &str, value: &Value) {
        let join = |segment: &str| {
            if prefix.is_empty() {
                segment.to_string()
            } else {
                format!("{}{}{}", prefix, KEY_DELIMITER, segment)
            }
        };
        match value {
            Value::Object(map) => {
                for (k, v) in map {
                    self.flatten_value(&join(k), v);
                }
            }
            Value::Array(items) => {
                for (i, v) in items.iter().enumerate() {
                    self.flatten_value(&join(&i.to_string()), v);
                }
            }
            Value::Null => {}
            Value::String(s) => self.set(prefix, s.clone()),
            other => self.set(prefix, other.to_string()),
        }
    }

    /// Set a value; an existing key keeps its original spelling
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        self.entries
            .entry(normalize(&key))
            .and_modify(|entry| entry.1 = value.clone())
            .or_insert((key.trim().to_string(), value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize(key)).map(|(_, v)| v.as_str())
    }

    /// First present key of `candidates`, with its value
    pub fn get_any<'a>(&'a self, candidates: &[&'a str]) -> Option<(&'a str, &'a str)> {
        candidates
            .iter()
            .find_map(|key| self.get(key).map(|value| (*key, value)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(&normalize(key)).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order, with keys as written
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries strictly below `prefix`, re-keyed relative to it
    pub fn section(&self, prefix: &str) -> Configuration {
        let needle = format!("{}{}", normalize(prefix), KEY_DELIMITER);
        let mut section = Configuration::new();
        for (normalized, (key, value)) in &self.entries {
            if normalized.starts_with(&needle) {
                section.set(&key.trim()[needle.len()..], value.clone());
            }
        }
        section
    }

    /// Whether any key lives strictly below `prefix`
    pub fn has_section(&self, prefix: &str) -> bool {
        let needle = format!("{}{}", normalize(prefix), KEY_DELIMITER);
        self.entries.keys().any(|k| k.starts_with(&needle))
    }

    /// Distinct first key segments directly below `prefix`
    pub fn child_names(&self, prefix: &str) -> Vec<String> {
        let section = self.section(prefix);
        let mut seen = BTreeSet::new();
        section
            .iter()
            .filter_map(|(key, _)| key.split(KEY_DELIMITER).next())
            .filter(|segment| seen.insert(segment.to_ascii_lowercase()))
            .map(str::to_string)
            .collect()
    }

    /// Overlay `other` on top of this configuration; `other` wins
    pub fn merge(&mut self, other: &Configuration) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// Apply `table` to every value under `namespace`. Returns the number of
    /// values that changed.
    pub fn substitute(&mut self, namespace: &str, table: &SubstitutionTable) -> usize {
        if table.is_empty() {
            return 0;
        }
        let needle = format!("{}{}", normalize(namespace), KEY_DELIMITER);
        let mut changed = 0;
        for (normalized, (_, value)) in self.entries.iter_mut() {
            if !normalized.starts_with(&needle) {
                continue;
            }
            let replaced = table.apply(value);
            if replaced != *value {
                *value = replaced;
                changed += 1;
            }
        }
        changed
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

enum Source {
    JsonFile { path: PathBuf, optional: bool },
    JsonText(String),
    Pairs(Vec<(String, String)>),
    Environment {
        prefix: Option<String>,
        vars: Option<Vec<(String, String)>>,
    },
}

/// Layered configuration sources; later layers win.
///
/// # Example
/// ```
/// use structured_log_facade::config::ConfigurationBuilder;
///
/// let config = ConfigurationBuilder::new()
///     .add_json_str(r#"{ "logging": { "MinimumLevel": "Information" } }"#)
///     .add_pairs([("logging:MinimumLevel", "Debug")])
///     .build()
///     .unwrap();
/// assert_eq!(config.get("LOGGING:minimumlevel"), Some("Debug"));
/// ```
#[derive(Default)]
pub struct ConfigurationBuilder {
    sources: Vec<Source>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn add_json_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::JsonFile {
            path: path.into(),
            optional: false,
        });
        self
    }

    /// Like [`add_json_file`](Self::add_json_file), but a missing file is skipped
    #[must_use = "builder methods return a new value"]
    pub fn add_optional_json_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::JsonFile {
            path: path.into(),
            optional: true,
        });
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn add_json_str(mut self, text: impl Into<String>) -> Self {
        self.sources.push(Source::JsonText(text.into()));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn add_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.sources.push(Source::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn add_settings(self, settings: &LogSettings, namespace: &str) -> Self {
        self.add_pairs(settings.to_key_value_pairs(namespace))
    }

    /// Process environment, read when [`build`](Self::build) runs.
    ///
    /// With a prefix only variables starting with it are used, and the
    /// prefix is stripped. `__` in a name stands for the key delimiter.
    #[must_use = "builder methods return a new value"]
    pub fn add_environment_variables(mut self, prefix: Option<&str>) -> Self {
        self.sources.push(Source::Environment {
            prefix: prefix.map(str::to_string),
            vars: None,
        });
        self
    }

    /// Same as [`add_environment_variables`](Self::add_environment_variables)
    /// over an explicit variable set
    #[must_use = "builder methods return a new value"]
    pub fn add_environment_from<I, K, V>(mut self, vars: I, prefix: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.sources.push(Source::Environment {
            prefix: prefix.map(str::to_string),
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        });
        self
    }

    pub fn build(self) -> Result<Configuration> {
        let mut config = Configuration::new();
        for source in self.sources {
            let layer = match source {
                Source::JsonFile { path, optional } => {
                    if optional && !path.exists() {
                        continue;
                    }
                    Configuration::from_json_file(&path)?
                }
                Source::JsonText(text) => Configuration::from_json_str(&text)?,
                Source::Pairs(pairs) => Configuration::from_pairs(pairs),
                Source::Environment { prefix, vars } => {
                    let vars = vars.unwrap_or_else(|| std::env::vars().collect());
                    environment_layer(vars, prefix.as_deref())
                }
            };
            config.merge(&layer);
        }
        Ok(config)
    }
}

fn environment_layer(vars: Vec<(String, String)>, prefix: Option<&str>) -> Configuration {
    let prefix = prefix.map(str::to_ascii_lowercase);
    vars.into_iter()
        .filter_map(|(name, value)| {
            let name = match prefix.as_deref() {
                Some(p) if name.to_ascii_lowercase().starts_with(p) => name[p.len()..].to_string(),
                Some(_) => return None,
                None => name,
            };
            (!name.is_empty()).then(|| (name.replace("__", KEY_DELIMITER), value))
        })
        .collect()
}
