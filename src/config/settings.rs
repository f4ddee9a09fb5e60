//! Typed logging settings

use super::configuration::Configuration;
use serde::{Deserialize, Serialize};

/// Strongly-typed alternative to raw configuration keys.
///
/// Describes a single buffered file writer. [`to_key_value_pairs`] expands it
/// into the generic key layout, so both paths produce the same topology.
///
/// [`to_key_value_pairs`]: LogSettings::to_key_value_pairs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LogSettings {
    pub minimum_level: Option<String>,
    pub write_to_name: Option<String>,
    pub log_path: Option<String>,
    pub application: Option<String>,
    pub log_name: Option<String>,
}

impl LogSettings {
    /// Flatten into configuration pairs under `namespace`.
    ///
    /// Fields without a value produce no entry.
    pub fn to_key_value_pairs(&self, namespace: &str) -> Vec<(String, String)> {
        let entries = [
            ("minimumLevel.default", self.minimum_level.as_deref()),
            ("writeTo:Name", Some("Async")),
            ("writeTo:Args:configure:Name", self.write_to_name.as_deref()),
            (
                "writeTo:Args:configure:Args:pathFormat",
                self.log_path.as_deref(),
            ),
            ("Properties:Application", self.application.as_deref()),
            ("Properties:LogName", self.log_name.as_deref()),
        ];

        entries
            .into_iter()
            .filter_map(|(key, value)| {
                value.map(|v| (format!("{}:{}", namespace, key), v.to_string()))
            })
            .collect()
    }

    pub fn to_configuration(&self, namespace: &str) -> Configuration {
        Configuration::from_pairs(self.to_key_value_pairs(namespace))
    }
}
