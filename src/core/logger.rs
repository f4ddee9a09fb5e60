//! Backend logger: owns the appenders and performs physical writes

use super::{
    appender::Appender,
    enricher::Enricher,
    error::Result,
    log_context::LogContext,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    scope,
};
use parking_lot::RwLock;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The structured backend behind a facade.
///
/// A `Logger` is safe to share between writers: every record is handed to
/// all appenders under a single lock, so fields of one record are never
/// interleaved with another. Appender failures and panics are isolated per
/// appender, counted, and reported on stderr; they never reach the caller.
pub struct Logger {
    min_level: RwLock<LogLevel>,
    appenders: RwLock<Vec<Box<dyn Appender>>>,
    /// Static tags merged into every record
    properties: LogContext,
    enrichers: Vec<Arc<dyn Enricher>>,
    metrics: Arc<LoggerMetrics>,
    closed: AtomicBool,
}

impl Logger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_level: RwLock::new(LogLevel::Information),
            appenders: RwLock::new(Vec::new()),
            properties: LogContext::new(),
            enrichers: Vec::new(),
            metrics: Arc::new(LoggerMetrics::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn add_appender(&mut self, appender: Box<dyn Appender>) {
        self.appenders.write().push(appender);
    }

    pub fn set_min_level(&self, level: LogLevel) {
        *self.min_level.write() = level;
    }

    pub fn min_level(&self) -> LogLevel {
        *self.min_level.read()
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= *self.min_level.read()
    }

    /// Static tags of this logger
    pub fn properties(&self) -> &LogContext {
        &self.properties
    }

    /// Names of the attached appenders, in write order
    pub fn appender_names(&self) -> Vec<String> {
        self.appenders
            .read()
            .iter()
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Shared handle to the metrics, for sinks that report into them
    pub fn metrics_handle(&self) -> Arc<LoggerMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Write one record to every appender.
    ///
    /// Properties already on the entry win over the tags of the active
    /// scopes, which win over this logger's static tags; enrichers only fill
    /// in what is still absent. Returns `true` when every appender accepted
    /// the record.
    pub fn emit(&self, mut entry: LogEntry) -> bool {
        if self.is_closed() {
            return false;
        }
        if !self.is_enabled(entry.level) {
            self.metrics.record_filtered();
            return true;
        }

        entry.properties.merge_missing(&scope::current());
        entry.properties.merge_missing(&self.properties);
        for (idx, enricher) in self.enrichers.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                enricher.enrich(&mut entry)
            }));
            if let Err(panic_info) = result {
                eprintln!(
                    "[LOGGER ERROR] Enricher #{} panicked: {}",
                    idx,
                    panic_message(panic_info.as_ref())
                );
            }
        }

        let mut appenders = self.appenders.write();
        let ok = Self::process_sync(&mut appenders, &entry);
        if ok {
            self.metrics.record_written();
        } else {
            self.metrics.record_failed();
        }
        ok
    }

    /// Hand a record to each appender with per-appender panic isolation.
    fn process_sync(appenders: &mut [Box<dyn Appender>], entry: &LogEntry) -> bool {
        let mut has_error = false;

        for (idx, appender) in appenders.iter_mut().enumerate() {
            let append_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                appender.append(entry)
            }));

            match append_result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!(
                        "[LOGGER ERROR] Appender #{} ({}) failed: {}",
                        idx,
                        appender.name(),
                        e
                    );
                    has_error = true;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Appender #{} panicked: {}. \
                         Other appenders continue to function.",
                        idx,
                        panic_message(panic_info.as_ref())
                    );
                    has_error = true;
                }
            }
        }

        !has_error
    }

    pub fn flush(&self) -> Result<()> {
        let mut appenders = self.appenders.write();
        for appender in appenders.iter_mut() {
            appender.flush()?;
        }
        Ok(())
    }

    /// Flush every appender and refuse further writes.
    ///
    /// Flush errors are reported on stderr; closing never fails.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut appenders = self.appenders.write();
        for appender in appenders.iter_mut() {
            if let Err(e) = appender.flush() {
                eprintln!(
                    "[LOGGER ERROR] Failed to flush '{}' during close: {}",
                    appender.name(),
                    e
                );
            }
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();

        let failed = self.metrics.failed_writes();
        if failed > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} failed writes \
                 (failure rate: {:.2}%)",
                failed,
                self.metrics.failure_rate()
            );
        }
    }
}

pub(crate) fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Builder for constructing a backend Logger
///
/// # Example
/// ```
/// use structured_log_facade::prelude::*;
///
/// let logger = Logger::builder()
///     .min_level(LogLevel::Debug)
///     .appender(ConsoleAppender::new())
///     .property("Application", "billing")
///     .build();
/// assert_eq!(logger.properties().get_str("Application"), Some("billing"));
/// ```
pub struct LoggerBuilder {
    min_level: LogLevel,
    appenders: Vec<Box<dyn Appender>>,
    properties: LogContext,
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Information,
            appenders: Vec::new(),
            properties: LogContext::new(),
            enrichers: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appenders.push(Box::new(appender));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_appender(mut self, appender: Box<dyn Appender>) -> Self {
        self.appenders.push(appender);
        self
    }

    /// Add a static tag; a later call with the same name replaces the value
    #[must_use = "builder methods return a new value"]
    pub fn property(
        mut self,
        name: impl Into<String>,
        value: impl Into<super::log_context::FieldValue>,
    ) -> Self {
        self.properties.add_field(name, value);
        self
    }

    /// Add a static tag only if no tag with that name is set yet
    #[must_use = "builder methods return a new value"]
    pub fn default_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<super::log_context::FieldValue>,
    ) -> Self {
        self.properties.add_field_if_absent(name, value);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn properties(mut self, properties: &LogContext) -> Self {
        self.properties.overlay(properties);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            min_level: RwLock::new(self.min_level),
            appenders: RwLock::new(self.appenders),
            properties: self.properties,
            enrichers: self.enrichers,
            metrics: Arc::new(LoggerMetrics::new()),
            closed: AtomicBool::new(false),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LoggerError, PropertyEnricher};
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<LogEntry>>>);

    impl Appender for Capture {
        fn append(&mut self, entry: &LogEntry) -> Result<()> {
            self.0.lock().push(entry.clone());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "capture"
        }
    }

    struct Failing;

    impl Appender for Failing {
        fn append(&mut self, _entry: &LogEntry) -> Result<()> {
            Err(LoggerError::sink_write("failing", "disk gone"))
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    struct Panicking;

    impl Appender for Panicking {
        fn append(&mut self, _entry: &LogEntry) -> Result<()> {
            panic!("sink exploded");
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_builder_defaults() {
        let logger = Logger::builder().build();
        assert_eq!(logger.min_level(), LogLevel::Information);
        assert!(logger.appender_names().is_empty());
    }

    #[test]
    fn test_min_level_filters() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .min_level(LogLevel::Warning)
            .appender(capture.clone())
            .build();

        logger.emit(LogEntry::new(LogLevel::Information, "quiet"));
        logger.emit(LogEntry::new(LogLevel::Error, "loud"));

        let seen = capture.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "loud");
        assert_eq!(logger.metrics().filtered(), 1);
    }

    #[test]
    fn test_property_precedence() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .appender(capture.clone())
            .property("Application", "static-app")
            .property("Region", "static-region")
            .enricher(Arc::new(PropertyEnricher::new("Region", "enricher-region")))
            .enricher(Arc::new(PropertyEnricher::new("Zone", "z1")))
            .build();

        let _scope = scope::push(
            LogContext::new()
                .with_field("Region", "scoped-region")
                .with_field("Context", "scoped"),
        );
        let mut entry = LogEntry::new(LogLevel::Information, "hello");
        entry.properties.add_field("Context", "explicit");
        logger.emit(entry);

        let seen = capture.0.lock();
        let props = &seen[0].properties;
        assert_eq!(props.get_str("Context"), Some("explicit"));
        assert_eq!(props.get_str("Region"), Some("scoped-region"));
        assert_eq!(props.get_str("Application"), Some("static-app"));
        assert_eq!(props.get_str("Zone"), Some("z1"));
    }

    #[test]
    fn test_failing_appender_is_isolated() {
        let capture = Capture::default();
        let logger = Logger::builder()
            .appender(Failing)
            .appender(Panicking)
            .appender(capture.clone())
            .build();

        assert!(!logger.emit(LogEntry::new(LogLevel::Error, "still delivered")));
        assert_eq!(capture.0.lock().len(), 1);
        assert_eq!(logger.metrics().failed_writes(), 1);
        assert_eq!(logger.metrics().total_written(), 0);
    }

    #[test]
    fn test_close_rejects_writes() {
        let capture = Capture::default();
        let logger = Logger::builder().appender(capture.clone()).build();
        logger.close();
        assert!(logger.is_closed());
        assert!(!logger.emit(LogEntry::new(LogLevel::Fatal, "late")));
        assert!(capture.0.lock().is_empty());
    }
}
