//! The logging facade: a small write API in front of the structured backend
//!
//! Callers write through the [`Log`] trait. Every overload funnels into one
//! write path: the severity is mapped to a backend level, the call's
//! `Component`/`Process`/`Context` tags are captured together with the active
//! scope and the dynamic property sources, and the record is handed to the
//! logger's [`WriteScheduler`].

use super::enricher::{Enricher, PropertySource};
use super::error::{LoggerError, Result};
use super::log_context::{FieldValue, LogContext};
use super::log_entry::{ErrorInfo, LogEntry};
use super::log_level::LogLevel;
use super::logger::{panic_message, Logger, LoggerBuilder};
use super::scheduler::{PendingWrite, WriteMode, WriteScheduler};
use super::scope;
use super::severity::{map_host_level, HostLevel, Severity};
use crate::config::{
    Configuration, EnvSettings, LogSettings, SinkResolver, SubstitutionTable,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error payload accepted by the facade
pub type ErrorPayload<'a> = &'a (dyn StdError + Send + Sync + 'static);

/// How long [`StructuredLogger::flush`] waits for in-flight writes
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Message of the record every logger writes when it is built
pub const STARTED_MESSAGE: &str = "Started logging.";

/// Application title and version attached to every record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppIdentity {
    pub title: String,
    pub version: String,
}

impl AppIdentity {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.title, self.version)
    }
}

/// The facade's write API.
///
/// Four-argument methods take `(component, process, context, payload)`;
/// `write_process_*` methods take `(process, context, payload)` and write
/// an empty component. `timestamp` overrides the record time.
///
/// The returned futures complete once the write has been scheduled
/// (concurrent mode) or performed (synchronous mode); logging never fails
/// the caller.
#[async_trait]
pub trait Log: Send + Sync {
    async fn write_info(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_monitor(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_warning(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_warning_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_fatal_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    );

    async fn write_process_info(
        &self,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_info("", process, context, message, timestamp).await
    }

    async fn write_process_monitor(
        &self,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_monitor("", process, context, message, timestamp).await
    }

    async fn write_process_warning(
        &self,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_warning("", process, context, message, timestamp).await
    }

    async fn write_process_warning_error(
        &self,
        process: &str,
        context: &str,
        message: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_warning_error("", process, context, message, error, timestamp)
            .await
    }

    async fn write_process_error(
        &self,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_error("", process, context, error, timestamp).await
    }

    async fn write_process_fatal_error(
        &self,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        self.write_fatal_error("", process, context, error, timestamp)
            .await
    }
}

/// The per-call tags of one write
#[derive(Debug, Clone, Copy, Default)]
pub struct CallTags<'a> {
    pub component: &'a str,
    pub process: &'a str,
    pub context: &'a str,
}

impl<'a> CallTags<'a> {
    pub fn new(component: &'a str, process: &'a str, context: &'a str) -> Self {
        Self {
            component,
            process,
            context,
        }
    }

    fn to_context(self) -> LogContext {
        LogContext::new()
            .with_field("Component", self.component)
            .with_field("Process", self.process)
            .with_field("Context", self.context)
    }
}

/// Facade implementation over a backend [`Logger`].
///
/// Built with [`StructuredLogger::builder`]. The write mode is fixed at
/// construction.
pub struct StructuredLogger {
    scheduler: WriteScheduler,
    identity: AppIdentity,
    environment: Option<String>,
    property_sources: Vec<PropertySource>,
}

impl StructuredLogger {
    pub fn builder(identity: AppIdentity) -> StructuredLoggerBuilder {
        StructuredLoggerBuilder::new(identity)
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn write_mode(&self) -> WriteMode {
        self.scheduler.mode()
    }

    pub fn backend(&self) -> &Arc<Logger> {
        self.scheduler.backend()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.backend().is_enabled(level)
    }

    /// The single write path behind every facade method.
    ///
    /// A blank or missing message falls back to the error's summary.
    pub fn write(
        &self,
        level: LogLevel,
        tags: CallTags<'_>,
        message: Option<&str>,
        error: Option<ErrorInfo>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let backend = self.backend();
        if backend.is_closed() {
            return;
        }
        if !backend.is_enabled(level) {
            backend.metrics().record_filtered();
            return;
        }

        let mut entry = LogEntry::with_payload(level, message, error);
        if let Some(ts) = timestamp {
            entry = entry.with_timestamp(ts);
        }

        let mut frame = self.evaluate_sources();
        frame.overlay(&scope::current());
        frame.overlay(&tags.to_context());

        self.scheduler.schedule(PendingWrite::new(entry, frame));
    }

    fn evaluate_sources(&self) -> LogContext {
        let mut context = LogContext::new();
        for source in &self.property_sources {
            match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| source())) {
                Ok((name, value)) => context.add_field(name, value),
                Err(panic_info) => eprintln!(
                    "[LOGGER ERROR] Property source panicked: {}",
                    panic_message(panic_info.as_ref())
                ),
            }
        }
        context
    }

    /// Write at a severity of the facade's own taxonomy
    pub fn write_severity(
        &self,
        severity: Severity,
        tags: CallTags<'_>,
        message: Option<&str>,
        error: Option<ErrorPayload<'_>>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let error = error.map(|e| ErrorInfo::capture(e));
        self.write(severity.to_level(), tags, message, error, timestamp);
    }

    /// Bridge for hosts using the generic Trace..Critical taxonomy
    pub fn log(&self, level: HostLevel, message: &str, error: Option<&(dyn StdError + 'static)>) {
        self.write(
            map_host_level(level),
            CallTags::default(),
            Some(message),
            error.map(ErrorInfo::capture),
            None,
        );
    }

    /// Wait for in-flight writes, then flush every appender
    pub fn flush(&self) -> Result<()> {
        if !self.scheduler.wait_idle(DEFAULT_FLUSH_TIMEOUT) {
            return Err(LoggerError::other(format!(
                "{} writes still in flight after {:?}",
                self.scheduler.pending(),
                DEFAULT_FLUSH_TIMEOUT
            )));
        }
        self.backend().flush()
    }

    /// Drain in-flight writes for at most `timeout`, then close the backend.
    ///
    /// Returns `false` if writes were still running when the timeout elapsed;
    /// those may be lost.
    pub fn close_and_flush(&self, timeout: Duration) -> bool {
        let drained = self.scheduler.wait_idle(timeout);
        if !drained {
            eprintln!(
                "[LOGGER WARNING] {} writes still in flight after {:?}, closing anyway",
                self.scheduler.pending(),
                timeout
            );
        }
        self.backend().close();
        drained
    }
}

#[async_trait]
impl Log for StructuredLogger {
    async fn write_info(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::Info, tags, Some(message), None, timestamp);
    }

    async fn write_monitor(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::Monitor, tags, Some(message), None, timestamp);
    }

    async fn write_warning(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::Warning, tags, Some(message), None, timestamp);
    }

    async fn write_warning_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::Warning, tags, Some(message), Some(error), timestamp);
    }

    async fn write_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::Error, tags, None, Some(error), timestamp);
    }

    async fn write_fatal_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let tags = CallTags::new(component, process, context);
        self.write_severity(Severity::FatalError, tags, None, Some(error), timestamp);
    }
}

enum BackendSource {
    Unset,
    Configuration(Configuration),
    Prebuilt(LoggerBuilder),
}

/// Builder for [`StructuredLogger`]
///
/// # Example
/// ```
/// use structured_log_facade::prelude::*;
///
/// let config = Configuration::from_pairs([
///     ("logging:MinimumLevel", "Debug"),
///     ("logging:writeTo:Name", "Console"),
/// ]);
/// let logger = StructuredLogger::builder(AppIdentity::new("billing", "1.4.0"))
///     .configuration(config)
///     .env_settings(EnvSettings::default().with_write_mode(WriteMode::Synchronous))
///     .build()
///     .unwrap();
/// assert_eq!(logger.write_mode(), WriteMode::Synchronous);
/// ```
pub struct StructuredLoggerBuilder {
    identity: AppIdentity,
    source: BackendSource,
    resolver: SinkResolver,
    substitutions: SubstitutionTable,
    env: Option<EnvSettings>,
    write_mode: Option<WriteMode>,
    log_name: Option<String>,
    property_sources: Vec<PropertySource>,
    enrichers: Vec<Arc<dyn Enricher>>,
}

impl StructuredLoggerBuilder {
    pub fn new(identity: AppIdentity) -> Self {
        Self {
            identity,
            source: BackendSource::Unset,
            resolver: SinkResolver::new(),
            substitutions: SubstitutionTable::new(),
            env: None,
            write_mode: None,
            log_name: None,
            property_sources: Vec::new(),
            enrichers: Vec::new(),
        }
    }

    /// Resolve sinks from raw configuration
    #[must_use = "builder methods return a new value"]
    pub fn configuration(mut self, config: Configuration) -> Self {
        self.source = BackendSource::Configuration(config);
        self
    }

    /// Resolve sinks from typed settings
    #[must_use = "builder methods return a new value"]
    pub fn settings(mut self, settings: &LogSettings) -> Self {
        let config = settings.to_configuration(self.resolver.namespace());
        self.source = BackendSource::Configuration(config);
        self
    }

    /// Use an already assembled backend instead of configuration
    #[must_use = "builder methods return a new value"]
    pub fn backend(mut self, backend: LoggerBuilder) -> Self {
        self.source = BackendSource::Prebuilt(backend);
        self
    }

    /// Resolver (namespace and sink registry) used for configuration.
    ///
    /// Set it before [`settings`](Self::settings) when the namespace differs
    /// from the default.
    #[must_use = "builder methods return a new value"]
    pub fn resolver(mut self, resolver: SinkResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn substitutions(mut self, table: SubstitutionTable) -> Self {
        self.substitutions = table;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn env_settings(mut self, env: EnvSettings) -> Self {
        self.env = Some(env);
        self
    }

    /// Override the mode chosen by the environment
    #[must_use = "builder methods return a new value"]
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = Some(mode);
        self
    }

    /// Logical log name; defaults to `"<title>Log"`
    #[must_use = "builder methods return a new value"]
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.log_name = Some(name.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn property_source(mut self, source: PropertySource) -> Self {
        self.property_sources.push(source);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    /// Resolve the backend, attach static tags and write the startup record.
    ///
    /// Fails only when the backend cannot be resolved.
    pub fn build(self) -> Result<StructuredLogger> {
        let env = self.env.unwrap_or_else(EnvSettings::from_env);
        let mode = self.write_mode.unwrap_or(env.write_mode);

        let backend = match self.source {
            BackendSource::Configuration(mut config) => {
                config.substitute(self.resolver.namespace(), &self.substitutions);
                self.resolver.resolve_builder(&config)?
            }
            BackendSource::Prebuilt(builder) => builder,
            BackendSource::Unset => {
                return Err(LoggerError::config(
                    self.resolver.namespace(),
                    "no logging configuration supplied",
                ))
            }
        };

        let title = self.identity.title.clone();
        let log_name = self.log_name.unwrap_or_else(|| format!("{}Log", title));
        let backend = self
            .enrichers
            .into_iter()
            .fold(backend, |builder, enricher| builder.enricher(enricher))
            .default_property("Application", title.as_str())
            .default_property("Version", self.identity.version.as_str())
            .default_property("Environment", FieldValue::from(env.environment_name.clone()))
            .default_property("LogName", log_name)
            .build();

        let logger = StructuredLogger {
            scheduler: WriteScheduler::new(Arc::new(backend), mode),
            identity: self.identity,
            environment: env.environment_name,
            property_sources: self.property_sources,
        };

        let startup_tags = CallTags::new(
            &logger.identity.title,
            &logger.identity.version,
            logger.environment.as_deref().unwrap_or_default(),
        );
        logger.write(
            LogLevel::Information,
            startup_tags,
            Some(STARTED_MESSAGE),
            None,
            None,
        );

        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{property_source, Appender};
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

    #[derive(Debug)]
    struct Quiet;

    impl fmt::Display for Quiet {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Ok(())
        }
    }

    impl StdError for Quiet {}

    fn sync_logger(capture: &Capture) -> StructuredLogger {
        StructuredLogger::builder(AppIdentity::new("orders", "2.1.0"))
            .backend(
                Logger::builder()
                    .min_level(LogLevel::Verbose)
                    .appender(capture.clone()),
            )
            .env_settings(
                EnvSettings::default()
                    .with_environment("Staging")
                    .with_write_mode(WriteMode::Synchronous),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_started_logging_record() {
        let capture = Capture::default();
        let _logger = sync_logger(&capture);

        let seen = capture.0.lock();
        assert_eq!(seen.len(), 1);
        let entry = &seen[0];
        assert_eq!(entry.level, LogLevel::Information);
        assert_eq!(entry.message, STARTED_MESSAGE);
        assert_eq!(entry.property("Component"), Some("orders"));
        assert_eq!(entry.property("Process"), Some("2.1.0"));
        assert_eq!(entry.property("Context"), Some("Staging"));
        assert_eq!(entry.property("Application"), Some("orders"));
        assert_eq!(entry.property("LogName"), Some("ordersLog"));
    }

    #[tokio::test]
    async fn test_three_and_four_argument_forms_match() {
        let capture = Capture::default();
        let logger = sync_logger(&capture);

        logger.write_info("", "sync", "batch-7", "imported", None).await;
        logger.write_process_info("sync", "batch-7", "imported", None).await;

        let seen = capture.0.lock();
        let (a, b) = (&seen[1], &seen[2]);
        assert_eq!(a.level, b.level);
        assert_eq!(a.message, b.message);
        assert_eq!(a.properties, b.properties);
        assert_eq!(b.property("Component"), Some(""));
    }

    #[tokio::test]
    async fn test_severity_mapping() {
        let capture = Capture::default();
        let logger = sync_logger(&capture);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");

        logger.write_monitor("c", "p", "x", "heartbeat", None).await;
        logger.write_warning("c", "p", "x", "slow", None).await;
        logger.write_warning_error("c", "p", "x", "retrying", &err, None).await;
        logger.write_error("c", "p", "x", &err, None).await;
        logger.write_fatal_error("c", "p", "x", &err, None).await;

        let seen = capture.0.lock();
        let levels: Vec<_> = seen[1..].iter().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Verbose,
                LogLevel::Warning,
                LogLevel::Warning,
                LogLevel::Error,
                LogLevel::Fatal
            ]
        );
        assert_eq!(seen[3].message, "retrying");
        assert_eq!(seen[3].error.as_ref().map(|e| e.message.as_str()), Some("disk full"));
        assert_eq!(seen[4].message, "disk full");
    }

    #[tokio::test]
    async fn test_error_without_message_uses_debug() {
        let capture = Capture::default();
        let logger = sync_logger(&capture);

        logger.write_process_error("p", "x", &Quiet, None).await;

        let seen = capture.0.lock();
        assert_eq!(seen[1].message, "Quiet");
    }

    #[tokio::test]
    async fn test_explicit_timestamp() {
        use chrono::TimeZone;
        let capture = Capture::default();
        let logger = sync_logger(&capture);
        let at = Utc.with_ymd_and_hms(2020, 2, 29, 12, 0, 0).unwrap();

        logger.write_info("c", "p", "x", "backdated", Some(at)).await;
        assert_eq!(capture.0.lock()[1].timestamp, at);
    }

    #[test]
    fn test_property_sources_and_precedence() {
        let capture = Capture::default();
        let logger = StructuredLogger::builder(AppIdentity::new("orders", "2.1.0"))
            .backend(Logger::builder().appender(capture.clone()))
            .env_settings(EnvSettings::default().with_write_mode(WriteMode::Synchronous))
            .property_source(property_source("Tenant", || "acme"))
            .property_source(property_source("Context", || "from-source"))
            .build()
            .unwrap();

        {
            let _scope = scope::push_property("Tenant", "scoped");
            logger.write(
                LogLevel::Information,
                CallTags::new("c", "p", "explicit"),
                Some("hello"),
                None,
                None,
            );
        }
        logger.write(
            LogLevel::Information,
            CallTags::new("c", "p", "x"),
            Some("after"),
            None,
            None,
        );

        let seen = capture.0.lock();
        assert_eq!(seen[1].property("Tenant"), Some("scoped"));
        assert_eq!(seen[1].property("Context"), Some("explicit"));
        assert_eq!(seen[2].property("Tenant"), Some("acme"));
        assert!(seen[2].properties.get("Environment").is_some());
    }

    #[test]
    fn test_host_level_bridge_and_filtering() {
        let capture = Capture::default();
        let logger = StructuredLogger::builder(AppIdentity::new("orders", "2.1.0"))
            .backend(
                Logger::builder()
                    .min_level(LogLevel::Warning)
                    .appender(capture.clone()),
            )
            .env_settings(EnvSettings::default().with_write_mode(WriteMode::Synchronous))
            .build()
            .unwrap();

        logger.log(HostLevel::Debug, "dropped", None);
        logger.log(HostLevel::Critical, "kept", None);

        let seen = capture.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].level, LogLevel::Fatal);
        assert_eq!(logger.backend().metrics().filtered(), 2);
    }

    #[test]
    fn test_build_without_backend_fails() {
        let result = StructuredLogger::builder(AppIdentity::new("x", "1"))
            .env_settings(EnvSettings::default())
            .build();
        assert!(result.err().unwrap().is_configuration());
    }

    #[test]
    fn test_close_and_flush_concurrent() {
        let capture = Capture::default();
        let logger = StructuredLogger::builder(AppIdentity::new("orders", "2.1.0"))
            .backend(Logger::builder().appender(capture.clone()))
            .env_settings(EnvSettings::default())
            .build()
            .unwrap();
        assert_eq!(logger.write_mode(), WriteMode::Concurrent);

        for i in 0..25 {
            logger.write(
                LogLevel::Information,
                CallTags::default(),
                Some(&format!("m{}", i)),
                None,
                None,
            );
        }
        assert!(logger.close_and_flush(Duration::from_secs(5)));
        assert_eq!(capture.0.lock().len(), 26);
        assert!(logger.backend().is_closed());
    }
}
