//! # Structured Log Facade
//!
//! A small, stable logging API in front of a configurable structured
//! backend.
//!
//! ## Features
//!
//! - **Facade**: info / monitor / warning / error / fatal writes, each with a
//!   component/process/context triple, through the [`Log`] trait
//! - **Enrichment**: static tags, per-record property sources, enrichers and
//!   thread- or task-scoped tags
//! - **Configuration**: layered key/value configuration with placeholder
//!   substitution, resolved into named write targets
//! - **Write modes**: synchronous or concurrent writes, chosen per logger
//! - **Startup**: bootstrap logger lifecycle and a guarded startup routine
//!
//! ## Example
//!
//! ```
//! use structured_log_facade::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let config = ConfigurationBuilder::new()
//!     .add_json_str(r#"{ "logging": { "MinimumLevel": "Information",
//!                                     "writeTo": { "Name": "Console" } } }"#)
//!     .build()?;
//!
//! let logger = StructuredLogger::builder(AppIdentity::new("orders", "2.1.0"))
//!     .configuration(config)
//!     .env_settings(EnvSettings::default().with_write_mode(WriteMode::Synchronous))
//!     .build()?;
//!
//! logger.write_info("api", "checkout", "order-42", "Order accepted", None).await;
//! logger.close_and_flush(std::time::Duration::from_secs(1));
//! # Ok(())
//! # }
//! ```

pub mod appenders;
pub mod config;
pub mod core;
pub mod macros;
pub mod startup;

pub mod prelude {
    pub use crate::appenders::{BufferedAppender, ConsoleAppender, FileAppender, SinkRegistry};
    pub use crate::config::{
        Configuration, ConfigurationBuilder, EnvSettings, LogSettings, SinkResolver,
        SubstitutionTable,
    };
    pub use crate::core::{
        Appender, AppIdentity, CallTags, Enricher, ErrorInfo, FieldValue, FutureExt, HostLevel,
        Log, LogContext, LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        OutputFormat, OverflowPolicy, Result, Severity, StructuredLogger, TimestampFormat,
        WriteMode,
    };
    pub use crate::startup::{guard_startup, StartupGuard, StartupLogger, StartupOptions};
}

pub use appenders::{BufferedAppender, ConsoleAppender, FileAppender, SinkRegistry};
pub use config::{Configuration, ConfigurationBuilder, EnvSettings, LogSettings, SinkResolver};
pub use core::{
    scope, Appender, AppIdentity, CallTags, ErrorInfo, FieldValue, HostLevel, Log, LogContext,
    LogEntry, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics, OutputFormat,
    OverflowPolicy, Result, Severity, StructuredLogger, TimestampFormat, WriteMode,
};
pub use startup::{StartupGuard, StartupLogger};
