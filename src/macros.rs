//! Logging macros for ergonomic message formatting.
//!
//! The level macros format their arguments like `format!` and write through
//! [`StructuredLogger::write`](crate::StructuredLogger::write). Per-call tags
//! can be given as a leading `[component, process, context]` list.
//!
//! # Examples
//!
//! ```
//! use structured_log_facade::prelude::*;
//! use structured_log_facade::{app_identity, info, warn};
//!
//! let logger = StructuredLogger::builder(app_identity!())
//!     .backend(Logger::builder().appender(ConsoleAppender::with_colors(false)))
//!     .env_settings(EnvSettings::default().with_write_mode(WriteMode::Synchronous))
//!     .build()
//!     .unwrap();
//!
//! info!(logger, "Server listening on port {}", 8080);
//! warn!(logger, ["http", "accept", "conn-17"], "Slow handshake: {} ms", 950);
//! ```

/// [`AppIdentity`](crate::AppIdentity) of the calling crate, from its
/// `Cargo.toml` name and version.
#[macro_export]
macro_rules! app_identity {
    () => {
        $crate::AppIdentity::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    };
}

/// Log a formatted message at the given level.
///
/// ```
/// # use structured_log_facade::prelude::*;
/// # let logger = StructuredLogger::builder(AppIdentity::new("demo", "1.0"))
/// #     .backend(Logger::builder())
/// #     .env_settings(EnvSettings::default())
/// #     .build()
/// #     .unwrap();
/// use structured_log_facade::log;
/// log!(logger, LogLevel::Information, "Simple message");
/// log!(logger, LogLevel::Error, ["db", "connect", "primary"], "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, [$component:expr, $process:expr, $context:expr], $($arg:tt)+) => {
        $logger.write(
            $level,
            $crate::CallTags::new($component, $process, $context),
            Some(&format!($($arg)+)),
            None,
            None,
        )
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.write(
            $level,
            $crate::CallTags::default(),
            Some(&format!($($arg)+)),
            None,
            None,
        )
    };
}

/// Log a monitoring (verbose) message.
#[macro_export]
macro_rules! monitor {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Verbose, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Information, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message without an error value.
///
/// Use [`Log::write_error`](crate::Log::write_error) to attach the error
/// itself.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
