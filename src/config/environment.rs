//! Process environment read once into explicit settings

use crate::core::WriteMode;

/// Environment variable holding the deployment environment name
pub const ENVIRONMENT_ENV: &str = "APP_ENVIRONMENT";

/// Environment name under which the bootstrap logger is skipped
pub const TESTING_ENVIRONMENT: &str = "Testing";

/// Parse a boolean toggle: `true` / `false`, case-insensitive, surrounding
/// whitespace ignored. Anything else is `None`.
pub fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Settings that come from the process environment rather than from the
/// logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    pub environment_name: Option<String>,
    pub write_mode: WriteMode,
    pub testing_environment: String,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            environment_name: lookup(ENVIRONMENT_ENV).filter(|v| !v.trim().is_empty()),
            write_mode: WriteMode::from_toggle(
                lookup(crate::core::scheduler::SINGLE_THREAD_MODE_ENV).as_deref(),
            ),
            testing_environment: TESTING_ENVIRONMENT.to_string(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, name: impl Into<String>) -> Self {
        self.environment_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Environment name, or the empty string when unset
    pub fn environment(&self) -> &str {
        self.environment_name.as_deref().unwrap_or_default()
    }

    pub fn is_testing(&self) -> bool {
        self.environment_name
            .as_deref()
            .is_some_and(|env| env.eq_ignore_ascii_case(&self.testing_environment))
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            environment_name: None,
            write_mode: WriteMode::default(),
            testing_environment: TESTING_ENVIRONMENT.to_string(),
        }
    }
}
