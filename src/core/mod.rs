//! Core logger types and traits

pub mod appender;
pub mod enricher;
pub mod error;
pub mod facade;
pub mod log_context;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod overflow_policy;
pub mod scheduler;
pub mod scope;
pub mod severity;
pub mod timestamp;

pub use appender::Appender;
pub use enricher::{property_source, Enricher, PropertyEnricher, PropertySource, ThreadNameEnricher};
pub use error::{LoggerError, Result};
pub use facade::{
    AppIdentity, CallTags, ErrorPayload, Log, StructuredLogger, StructuredLoggerBuilder,
    DEFAULT_FLUSH_TIMEOUT, STARTED_MESSAGE,
};
pub use log_context::{FieldValue, LogContext};
pub use log_entry::{ErrorInfo, LogEntry};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use output_format::{LogEntity, OutputFormat};
pub use overflow_policy::{LogPriority, OverflowCallback, OverflowPolicy};
pub use scheduler::{PendingWrite, WriteMode, WriteScheduler, SINGLE_THREAD_MODE_ENV};
pub use scope::{FutureExt, LogScopeFuture, ScopeGuard};
pub use severity::{map_host_level, map_raw_host_level, HostLevel, Severity};
pub use timestamp::TimestampFormat;
