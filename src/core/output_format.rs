//! Output layouts for log entries
//!
//! - Text: `2025-01-08 10:30:45:123 [INF] orders:sync:batch-7 - Imported 12 rows`
//! - Json: one `LogEntity` object per line

use super::log_entry::LogEntry;
use super::timestamp::TimestampFormat;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Properties rendered in dedicated positions rather than as trailing fields
const WELL_KNOWN: [&str; 6] = [
    "Component",
    "Process",
    "Context",
    "Application",
    "Version",
    "Environment",
];

/// Static tags left out of the text layout
const TEXT_HIDDEN: [&str; 1] = ["LogName"];

/// Output layout for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn format(&self, entry: &LogEntry, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Text => format_text(entry, timestamp_format, entry.level.short_name()),
            OutputFormat::Json => {
                let entity = LogEntity::from_entry(entry, timestamp_format);
                serde_json::to_string(&entity).unwrap_or_default()
            }
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: '{}'", s)),
        }
    }
}

/// Render the text layout with a caller-supplied level label, so the console
/// can colour it.
pub(crate) fn format_text(
    entry: &LogEntry,
    timestamp_format: &TimestampFormat,
    level_label: &str,
) -> String {
    let mut out = format!(
        "{} [{}] {}:{}:{} - {}",
        timestamp_format.format(&entry.timestamp),
        level_label,
        entry.property("Component").unwrap_or_default(),
        entry.property("Process").unwrap_or_default(),
        entry.property("Context").unwrap_or_default(),
        entry.message
    );

    let extra = entry
        .properties
        .fields()
        .iter()
        .filter(|(k, _)| !WELL_KNOWN.contains(&k.as_str()) && !TEXT_HIDDEN.contains(&k.as_str()))
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>();
    if !extra.is_empty() {
        out.push(' ');
        out.push_str(&extra.join(" "));
    }

    if let Some(ref error) = entry.error {
        out.push_str(" | ");
        out.push_str(&error.trace().replace('\n', " "));
    }

    out
}

/// JSON shape of a record, one object per line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntity {
    pub date_time: String,
    pub level: String,
    pub env: Option<String>,
    pub app_name: Option<String>,
    pub version: Option<String>,
    pub component: Option<String>,
    pub process: Option<String>,
    pub context: Option<String>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    pub stack: Option<String>,
    pub msg: String,
    #[serde(flatten)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl LogEntity {
    pub fn from_entry(entry: &LogEntry, timestamp_format: &TimestampFormat) -> Self {
        let prop = |name: &str| entry.property(name).map(str::to_string);
        let properties = entry
            .properties
            .fields()
            .iter()
            .filter(|(k, _)| !WELL_KNOWN.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.to_json_value()))
            .collect();

        Self {
            date_time: timestamp_format.format(&entry.timestamp),
            level: entry.level.to_str().to_string(),
            env: prop("Environment"),
            app_name: prop("Application"),
            version: prop("Version"),
            component: prop("Component"),
            process: prop("Process"),
            context: prop("Context"),
            kind: entry.error.as_ref().and_then(|e| e.kind.clone()),
            stack: entry.error.as_ref().map(|e| e.trace()),
            msg: entry.message.clone(),
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorInfo, LogContext, LogLevel};
    use chrono::TimeZone;

    fn entry() -> LogEntry {
        LogEntry::new(LogLevel::Information, "Imported 12 rows")
            .with_timestamp(chrono::Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap())
            .with_properties(
                LogContext::new()
                    .with_field("Component", "orders")
                    .with_field("Process", "sync")
                    .with_field("Context", "batch-7")
                    .with_field("Application", "svc")
                    .with_field("LogName", "ordersLog")
                    .with_field("Attempt", 2),
            )
    }

    #[test]
    fn test_text_layout() {
        let line = OutputFormat::Text.format(&entry(), &TimestampFormat::Compact);
        assert_eq!(
            line,
            "2025-01-08 10:30:45:000 [INF] orders:sync:batch-7 - Imported 12 rows Attempt=2"
        );
    }

    #[test]
    fn test_text_layout_with_error() {
        let e = entry().with_error(ErrorInfo::from_message("disk full"));
        let line = OutputFormat::Text.format(&e, &TimestampFormat::Compact);
        assert!(line.ends_with("| disk full"));
    }

    #[test]
    fn test_json_entity_shape() {
        let line = OutputFormat::Json.format(&entry(), &TimestampFormat::Iso8601);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["DateTime"], "2025-01-08T10:30:45.000Z");
        assert_eq!(value["Level"], "Information");
        assert_eq!(value["AppName"], "svc");
        assert_eq!(value["Component"], "orders");
        assert_eq!(value["Msg"], "Imported 12 rows");
        assert_eq!(value["LogName"], "ordersLog");
        assert!(value["Env"].is_null());
        assert!(value.get("Application").is_none());
    }

    #[test]
    fn test_parse() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_json_escapes_multiline_message_once() {
        let e = LogEntry::new(LogLevel::Error, "first line\n\tsecond line");
        let line = OutputFormat::Json.format(&e, &TimestampFormat::Iso8601);

        assert!(!line.contains('\n'));
        assert!(line.contains(r#"first line\n\tsecond line"#));
        assert!(!line.contains(r#"\\n"#));
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["Msg"], "first line\n\tsecond line");
    }
}
