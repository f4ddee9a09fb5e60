//! Appender trait for log output destinations

use super::{error::Result, log_entry::LogEntry};

/// A write target. Appenders are owned by one backend logger and are only
/// called while that logger holds its appender lock, so one record is always
/// written in full before the next one starts.
pub trait Appender: Send + Sync {
    fn append(&mut self, entry: &LogEntry) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
