//! File appender with date-based path patterns
//!
//! The path may contain `{Date}` (`yyyyMMdd`) or `{Hour}` (`yyyyMMddHH`);
//! the file is switched whenever a record's timestamp maps to a different
//! path. Parent directories are created on demand.

use crate::core::{Appender, LogEntry, LoggerError, OutputFormat, Result, TimestampFormat};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const DATE_TOKEN: &str = "{Date}";
const HOUR_TOKEN: &str = "{Hour}";

pub struct FileAppender {
    path_format: String,
    current_path: Option<PathBuf>,
    writer: Option<BufWriter<File>>,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl FileAppender {
    /// Open (or create) the file for the current time.
    ///
    /// Opening eagerly surfaces unusable paths while the sink topology is
    /// being resolved rather than on the first write.
    pub fn new(path_format: impl Into<String>) -> Result<Self> {
        let mut appender = Self {
            path_format: path_format.into(),
            current_path: None,
            writer: None,
            timestamp_format: TimestampFormat::Compact,
            output_format: OutputFormat::Text,
        };
        appender.ensure_open(&Utc::now())?;
        Ok(appender)
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Path currently written to
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Expand the date tokens of a path format for the given instant
    pub fn expand_path(path_format: &str, at: &DateTime<Utc>) -> PathBuf {
        let expanded = path_format
            .replace(HOUR_TOKEN, &at.format("%Y%m%d%H").to_string())
            .replace(DATE_TOKEN, &at.format("%Y%m%d").to_string());
        PathBuf::from(expanded)
    }

    fn ensure_open(&mut self, at: &DateTime<Utc>) -> Result<()> {
        let path = Self::expand_path(&self.path_format, at);
        if self.writer.is_some() && self.current_path.as_ref() == Some(&path) {
            return Ok(());
        }

        if let Some(mut old) = self.writer.take() {
            old.flush()?;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "creating log directory",
                    parent.display().to_string(),
                    e,
                )
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                LoggerError::io_operation("opening log file", path.display().to_string(), e)
            })?;

        self.writer = Some(BufWriter::new(file));
        self.current_path = Some(path);
        Ok(())
    }
}

impl Appender for FileAppender {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        self.ensure_open(&entry.timestamp)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::sink_write("file", "File writer not initialized"))?;

        let mut output = self.output_format.format(entry, &self.timestamp_format);
        output.push('\n');
        writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileAppender {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
