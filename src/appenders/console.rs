//! Console appender implementation

use crate::core::output_format::format_text;
use crate::core::{Appender, LogEntry, LogLevel, OutputFormat, Result, TimestampFormat};
#[cfg(feature = "colors")]
use colored::Colorize;

pub struct ConsoleAppender {
    use_colors: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self {
            use_colors: cfg!(feature = "colors"),
            timestamp_format: TimestampFormat::Compact,
            output_format: OutputFormat::default(),
        }
    }

    pub fn with_colors(use_colors: bool) -> Self {
        Self {
            use_colors,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    fn level_label(&self, level: LogLevel) -> String {
        #[cfg(feature = "colors")]
        if self.use_colors {
            return level.short_name().color(level.color_code()).to_string();
        }
        level.short_name().to_string()
    }

    /// Render an entry exactly as it would be printed
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.output_format {
            OutputFormat::Text => {
                format_text(entry, &self.timestamp_format, &self.level_label(entry.level))
            }
            OutputFormat::Json => self.output_format.format(entry, &self.timestamp_format),
        }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let output = self.render(entry);

        // Route Error and Fatal levels to stderr, others to stdout
        match entry.level {
            LogLevel::Error | LogLevel::Fatal => eprintln!("{}", output),
            _ => println!("{}", output),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stderr().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
