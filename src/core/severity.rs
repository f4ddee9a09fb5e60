//! Level mapping between the facade's severities, the generic host taxonomy
//! and the backend's native [`LogLevel`] scale.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a facade call, ordered by increasing criticality.
///
/// `FatalError` only describes the record; it never terminates the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Low-priority, verbose monitoring output
    Monitor,
    Info,
    Warning,
    Error,
    FatalError,
}

impl Severity {
    pub fn to_level(self) -> LogLevel {
        match self {
            Severity::Monitor => LogLevel::Verbose,
            Severity::Info => LogLevel::Information,
            Severity::Warning => LogLevel::Warning,
            Severity::Error => LogLevel::Error,
            Severity::FatalError => LogLevel::Fatal,
        }
    }
}

impl From<Severity> for LogLevel {
    fn from(severity: Severity) -> Self {
        severity.to_level()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Monitor => "Monitor",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::FatalError => "FatalError",
        };
        f.write_str(name)
    }
}

/// Generic severity taxonomy used by host frameworks.
///
/// Discriminants follow the host convention (`Trace = 0` .. `Critical = 5`);
/// the host's `None = 6` filter sentinel has no level and is rejected by
/// [`HostLevel::try_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HostLevel {
    Trace = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
}

/// Map a host level onto the backend scale.
pub fn map_host_level(level: HostLevel) -> LogLevel {
    match level {
        HostLevel::Trace => LogLevel::Verbose,
        HostLevel::Debug => LogLevel::Debug,
        HostLevel::Information => LogLevel::Information,
        HostLevel::Warning => LogLevel::Warning,
        HostLevel::Error => LogLevel::Error,
        HostLevel::Critical => LogLevel::Fatal,
    }
}

/// Map a raw host discriminant onto the backend scale.
///
/// Anything outside `0..=5` is a [`LoggerError::Mapping`].
pub fn map_raw_host_level(raw: u8) -> Result<LogLevel> {
    HostLevel::try_from(raw).map(map_host_level)
}

impl From<HostLevel> for LogLevel {
    fn from(level: HostLevel) -> Self {
        map_host_level(level)
    }
}

impl TryFrom<u8> for HostLevel {
    type Error = LoggerError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(HostLevel::Trace),
            1 => Ok(HostLevel::Debug),
            2 => Ok(HostLevel::Information),
            3 => Ok(HostLevel::Warning),
            4 => Ok(HostLevel::Error),
            5 => Ok(HostLevel::Critical),
            other => Err(LoggerError::mapping(other)),
        }
    }
}

impl FromStr for HostLevel {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Trace" => Ok(HostLevel::Trace),
            "Debug" => Ok(HostLevel::Debug),
            "Information" => Ok(HostLevel::Information),
            "Warning" => Ok(HostLevel::Warning),
            "Error" => Ok(HostLevel::Error),
            "Critical" => Ok(HostLevel::Critical),
            other => Err(LoggerError::mapping(other)),
        }
    }
}
