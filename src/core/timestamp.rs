//! Timestamp rendering for text and JSON output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Timestamp format options
///
/// # Examples
///
/// ```
/// use structured_log_facade::TimestampFormat;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(TimestampFormat::Compact.format(&at), "2025-01-08 10:30:45:000");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123Z`
    #[default]
    Iso8601,

    /// RFC 3339 with offset: `2025-01-08T10:30:45.123+00:00`
    Rfc3339,

    /// Space separated with colon milliseconds: `2025-01-08 10:30:45:123`
    Compact,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Custom strftime format
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Rfc3339 => {
                datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, false)
            }
            TimestampFormat::Compact => datetime.format("%Y-%m-%d %H:%M:%S:%3f").to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    /// Named formats are matched case-insensitively; anything containing a
    /// `%` is taken as a custom strftime pattern.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iso8601" => Ok(TimestampFormat::Iso8601),
            "rfc3339" => Ok(TimestampFormat::Rfc3339),
            "compact" => Ok(TimestampFormat::Compact),
            "unixmillis" => Ok(TimestampFormat::UnixMillis),
            _ if s.contains('%') => Ok(TimestampFormat::Custom(s.to_string())),
            _ => Err(format!("Invalid timestamp format: '{}'", s)),
        }
    }
}
