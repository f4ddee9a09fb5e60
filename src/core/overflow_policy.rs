//! Overflow policies for buffering sinks
//!
//! When the queue of a buffering sink is full, these policies decide what
//! happens to the record that does not fit.

use super::log_level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Policy for handling queue overflow in a buffering sink
///
/// # Example
///
/// ```
/// use structured_log_facade::OverflowPolicy;
/// use std::time::Duration;
///
/// let policy: OverflowPolicy = "BlockWithTimeout:250".parse().unwrap();
/// assert_eq!(policy, OverflowPolicy::BlockWithTimeout(Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Silently drop the record, counting it in the metrics
    DropNewest,

    /// Block the writing thread until space is available
    Block,

    /// Block for at most the given duration, then drop
    BlockWithTimeout(Duration),

    /// Drop and report on the fallback channel and the overflow callback
    #[default]
    AlertAndDrop,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::BlockWithTimeout(d) => write!(f, "BlockWithTimeout({:?})", d),
            OverflowPolicy::AlertAndDrop => write!(f, "AlertAndDrop"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    /// Accepts `DropNewest`, `Block`, `AlertAndDrop` and
    /// `BlockWithTimeout:<millis>` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(millis) = lower.strip_prefix("blockwithtimeout:") {
            return millis
                .trim()
                .parse::<u64>()
                .map(|ms| OverflowPolicy::BlockWithTimeout(Duration::from_millis(ms)))
                .map_err(|_| format!("Invalid overflow timeout: '{}'", trimmed));
        }
        match lower.as_str() {
            "dropnewest" => Ok(OverflowPolicy::DropNewest),
            "block" => Ok(OverflowPolicy::Block),
            "alertanddrop" => Ok(OverflowPolicy::AlertAndDrop),
            _ => Err(format!("Invalid overflow policy: '{}'", trimmed)),
        }
    }
}

/// Priority level for record preservation during overflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogPriority {
    /// Verbose, Debug, Information
    #[default]
    Normal = 0,
    /// Warning
    High = 1,
    /// Error, Fatal - never dropped, the writer blocks instead
    Critical = 2,
}

impl LogPriority {
    pub fn of(level: LogLevel) -> Self {
        match level {
            LogLevel::Verbose | LogLevel::Debug | LogLevel::Information => LogPriority::Normal,
            LogLevel::Warning => LogPriority::High,
            LogLevel::Error | LogLevel::Fatal => LogPriority::Critical,
        }
    }
}

/// Callback for overflow notifications
///
/// The parameter is the total count of dropped records so far.
pub type OverflowCallback = Arc<dyn Fn(u64) + Send + Sync>;
