//! Configuration → live backend logger

use super::configuration::{Configuration, KEY_DELIMITER};
use crate::appenders::registry::{parse_writer_specs, SinkRegistry, SinkSpec};
use crate::core::{LogContext, LogLevel, Logger, LoggerBuilder, LoggerError, Result};

/// Namespace the resolver reads when none is given
pub const DEFAULT_NAMESPACE: &str = "logging";

/// Reads the sink topology under one configuration namespace.
///
/// Keys (case-insensitive, relative to the namespace):
///
/// | key | meaning |
/// |-----|---------|
/// | `minimumLevel.default`, `MinimumLevel:Default`, `MinimumLevel` | minimum level (required) |
/// | `writeTo:Name`, `writeTo:Args:*` | a single writer |
/// | `writeTo:<i>:Name`, `writeTo:<i>:Args:*` | several writers |
/// | `Properties:<Name>` | static tags |
///
/// Resolution fails fast: any missing or malformed key is a
/// [`LoggerError::Configuration`] and no logger is returned.
#[derive(Debug, Clone)]
pub struct SinkResolver {
    namespace: String,
    registry: SinkRegistry,
}

impl SinkResolver {
    pub fn new() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            registry: SinkRegistry::with_builtins(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: SinkRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn registry(&self) -> &SinkRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SinkRegistry {
        &mut self.registry
    }

    fn key(&self, relative: &str) -> String {
        format!("{}{}{}", self.namespace, KEY_DELIMITER, relative)
    }

    pub fn minimum_level(&self, config: &Configuration) -> Result<LogLevel> {
        let candidates = [
            self.key("minimumLevel.default"),
            self.key("MinimumLevel:Default"),
            self.key("MinimumLevel"),
        ];
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();

        let (key, raw) = config.get_any(&refs).ok_or_else(|| {
            LoggerError::config(candidates[0].clone(), "minimum level is required")
        })?;
        raw.parse::<LogLevel>()
            .map_err(|e| LoggerError::config(key, e))
    }

    pub fn writer_specs(&self, config: &Configuration) -> Result<Vec<SinkSpec>> {
        let specs = parse_writer_specs(config, &self.key("writeTo"))?;
        for spec in &specs {
            if !self.registry.contains(&spec.name) {
                return Err(LoggerError::config(
                    format!("{}{}Name", spec.key, KEY_DELIMITER),
                    format!("unknown write target '{}'", spec.name),
                ));
            }
        }
        Ok(specs)
    }

    /// `Properties:<Name>` entries as static tags
    pub fn static_properties(&self, config: &Configuration) -> LogContext {
        config
            .section(&self.key("Properties"))
            .iter()
            .filter(|(name, _)| !name.contains(KEY_DELIMITER))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Validate everything, then build the appenders into a builder so
    /// callers can add tags and enrichers before finishing.
    pub fn resolve_builder(&self, config: &Configuration) -> Result<LoggerBuilder> {
        let min_level = self.minimum_level(config)?;
        let specs = self.writer_specs(config)?;
        let properties = self.static_properties(config);

        let builder = self
            .registry
            .build_all(&specs)?
            .into_iter()
            .fold(Logger::builder(), |builder, appender| {
                builder.boxed_appender(appender)
            });
        Ok(builder.min_level(min_level).properties(&properties))
    }

    pub fn resolve(&self, config: &Configuration) -> Result<Logger> {
        Ok(self.resolve_builder(config)?.build())
    }
}

impl Default for SinkResolver {
    fn default() -> Self {
        Self::new()
    }
}
