//! Log entry structure

use super::log_context::LogContext;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error as StdError;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// An error captured by value on the caller's thread.
///
/// Deferred writes run after the caller's error may be gone, so everything
/// the sinks need is copied out up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Leading type or variant name taken from the debug representation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Display text of the error, possibly empty
    pub message: String,
    /// Display text of each `source()` in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    /// Debug representation of the error
    pub debug: String,
}

impl ErrorInfo {
    pub fn capture(error: &(dyn StdError + 'static)) -> Self {
        let debug = format!("{:?}", error);
        let mut sources = Vec::new();
        let mut next = error.source();
        while let Some(source) = next {
            sources.push(source.to_string());
            next = source.source();
        }
        Self {
            kind: Self::leading_identifier(&debug),
            message: error.to_string(),
            sources,
            debug,
        }
    }

    /// Build from a plain message, for callers that only have text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: None,
            debug: format!("{:?}", message),
            message,
            sources: Vec::new(),
        }
    }

    /// Message to log for this error: the display text, or the debug
    /// representation when the display text is blank.
    pub fn summary(&self) -> &str {
        if self.message.trim().is_empty() {
            &self.debug
        } else {
            &self.message
        }
    }

    /// Multi-line trace: the summary followed by each source.
    pub fn trace(&self) -> String {
        let mut out = self.summary().to_string();
        for source in &self.sources {
            out.push_str("\n  caused by: ");
            out.push_str(source);
        }
        out
    }

    fn leading_identifier(debug: &str) -> Option<String> {
        let ident: String = debug
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
            .collect();
        if ident.is_empty() {
            None
        } else {
            Some(ident)
        }
    }
}

impl<E: StdError + 'static> From<&E> for ErrorInfo {
    fn from(error: &E) -> Self {
        ErrorInfo::capture(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub thread_id: String,
    pub thread_name: Option<String>,
    #[serde(skip_serializing_if = "LogContext::is_empty", default)]
    pub properties: LogContext,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            error: None,
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            properties: LogContext::new(),
        }
    }

    /// Build an entry from an optional message and an optional error.
    ///
    /// A missing or blank message falls back to the error's summary, so an
    /// entry always carries text.
    pub fn with_payload(level: LogLevel, message: Option<&str>, error: Option<ErrorInfo>) -> Self {
        let text = match (message, &error) {
            (Some(m), _) if !m.trim().is_empty() => m.to_string(),
            (_, Some(e)) => e.summary().to_string(),
            (Some(m), None) => m.to_string(),
            (None, None) => String::new(),
        };
        let mut entry = Self::new(level, text);
        entry.error = error;
        entry
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_properties(mut self, properties: LogContext) -> Self {
        self.properties = properties;
        self
    }

    /// String property lookup
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get_str(name)
    }
}
