//! Guarded service startup
//!
//! Wraps the startup routine of a service: announces it, runs it, and when it
//! fails records the failure, keeps the process alive for a while so the
//! failure can be seen between restarts, and always flushes the logger.

use super::lifecycle::{StartupLogger, StartupPhase};
use crate::appenders::{ConsoleAppender, FileAppender};
use crate::config::{parse_bool, EnvSettings};
use crate::core::facade::{AppIdentity, CallTags, StructuredLogger};
use crate::core::logger::panic_message;
use crate::core::{ErrorInfo, LogLevel, Logger, LoggerError, Result, WriteMode};
use futures::FutureExt;
use std::error::Error as StdError;
use std::future::Future;
use std::io::IsTerminal;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::oneshot;

/// Free-form environment description logged at startup
pub const ENV_INFO_ENV: &str = "ENV_INFO";
/// Seconds to wait after a failed startup
pub const FAILURE_WAIT_ENV: &str = "STARTUP_FAILURE_WAIT_SECONDS";
/// Whether Enter ends the failure wait early
pub const INTERACTIVE_WAIT_ENV: &str = "STARTUP_INTERACTIVE_WAIT";

pub const DEFAULT_FAILURE_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Service name used when none is given and the executable name is unknown
pub const UNKNOWN_SERVICE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupOptions {
    pub service_name: String,
    pub version: String,
    pub env_info: Option<String>,
    pub failure_wait: Duration,
    /// Let an operator end the failure wait by pressing Enter
    pub interactive_wait: bool,
    pub close_timeout: Duration,
}

impl StartupOptions {
    pub fn new(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            version: version.into(),
            env_info: None,
            failure_wait: DEFAULT_FAILURE_WAIT,
            interactive_wait: false,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    pub fn from_env(service_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::from_lookup(service_name, version, |name| std::env::var(name).ok())
    }

    /// [`StartupOptions::from_env`] with the identity's title and version
    pub fn from_identity(identity: &AppIdentity) -> Self {
        Self::from_env(identity.title.clone(), identity.version.clone())
    }

    /// Read [`ENV_INFO_ENV`], [`FAILURE_WAIT_ENV`] and
    /// [`INTERACTIVE_WAIT_ENV`] through `lookup`. Interactive waiting
    /// defaults to whether stdin is a terminal.
    pub fn from_lookup<F>(
        service_name: impl Into<String>,
        version: impl Into<String>,
        lookup: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let failure_wait = lookup(FAILURE_WAIT_ENV)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_FAILURE_WAIT);
        let interactive_wait = lookup(INTERACTIVE_WAIT_ENV)
            .and_then(|v| parse_bool(&v))
            .unwrap_or_else(|| std::io::stdin().is_terminal());

        Self {
            env_info: lookup(ENV_INFO_ENV),
            failure_wait,
            interactive_wait,
            ..Self::new(service_name, version)
        }
    }

    #[must_use]
    pub fn with_failure_wait(mut self, wait: Duration) -> Self {
        self.failure_wait = wait;
        self
    }

    #[must_use]
    pub fn with_interactive_wait(mut self, interactive: bool) -> Self {
        self.interactive_wait = interactive;
        self
    }

    #[must_use]
    pub fn with_env_info(mut self, env_info: impl Into<String>) -> Self {
        self.env_info = Some(env_info.into());
        self
    }
}

/// File stem of the running executable, or [`UNKNOWN_SERVICE`]
pub fn default_service_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_SERVICE.to_string())
}

fn info(logger: &StructuredLogger, message: &str) {
    logger.write(LogLevel::Information, CallTags::default(), Some(message), None, None);
}

/// Run `action` under the startup guard.
///
/// Errors returned by the action and panics inside it both count as a
/// failed startup. On failure a Fatal `"Host terminated unexpectedly"`
/// record is written, the guard waits for `options.failure_wait` (or until
/// Enter is pressed when interactive waiting is on) and logs `"Terminated"`.
///
/// The current logger is closed after a failure. After a success only a
/// bootstrap logger is closed; a full logger installed by the action stays
/// open for the application and is just flushed.
///
/// Returns the action's value, or [`LoggerError::StartupFailed`] so the
/// caller can exit with a failure status.
pub async fn guard_startup<Fut, T, E>(
    logger: &StartupLogger,
    options: &StartupOptions,
    action: Fut,
) -> Result<T>
where
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    let current = logger.current();
    info(
        &current,
        &format!("{} version {}", options.service_name, options.version),
    );
    info(
        &current,
        &format!("ENV_INFO: {}", options.env_info.as_deref().unwrap_or_default()),
    );

    let failure = match AssertUnwindSafe(action).catch_unwind().await {
        Ok(Ok(value)) => {
            match logger.phase() {
                StartupPhase::Bootstrap => {
                    logger.close_and_flush(options.close_timeout);
                }
                StartupPhase::Full => {
                    if let Err(e) = logger.current().flush() {
                        eprintln!("[LOGGER ERROR] Failed to flush after startup: {}", e);
                    }
                }
            }
            return Ok(value);
        }
        Ok(Err(e)) => {
            let boxed: Box<dyn StdError + Send + Sync> = e.into();
            ErrorInfo::capture(&*boxed)
        }
        Err(panic_info) => ErrorInfo::from_message(format!(
            "startup panicked: {}",
            panic_message(panic_info.as_ref())
        )),
    };

    // the action may have superseded the bootstrap logger
    let current = logger.current();
    current.write(
        LogLevel::Fatal,
        CallTags::default(),
        Some("Host terminated unexpectedly"),
        Some(failure.clone()),
        None,
    );

    let announcement = if options.interactive_wait {
        format!(
            "Process will be terminated in {:?}. Press Enter to terminate immediately",
            options.failure_wait
        )
    } else {
        format!("Process will be terminated in {:?}", options.failure_wait)
    };
    info(&current, &announcement);
    // make the failure visible before the wait starts
    if let Err(e) = current.flush() {
        eprintln!("[LOGGER ERROR] Failed to flush startup failure: {}", e);
    }

    wait_for_termination(options.failure_wait, options.interactive_wait).await;

    info(&current, "Terminated");
    logger.close_and_flush(options.close_timeout);

    Err(LoggerError::startup_failed(
        options.service_name.clone(),
        failure.summary(),
    ))
}

async fn wait_for_termination(wait: Duration, interactive: bool) {
    if !interactive {
        tokio::time::sleep(wait).await;
        return;
    }

    // a detached reader thread does not hold up runtime shutdown
    let (tx, rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("startup-keypress".to_string())
        .spawn(move || {
            let mut line = String::new();
            // EOF means nobody is there to press Enter
            if let Ok(n) = std::io::stdin().read_line(&mut line) {
                if n > 0 {
                    let _ = tx.send(());
                }
            }
        });
    if spawned.is_err() {
        tokio::time::sleep(wait).await;
        return;
    }

    tokio::select! {
        _ = tokio::time::sleep(wait) => {}
        Ok(()) = rx => {}
    }
}

/// Default bootstrap setup: console plus `logs/<service>.start.log`.
///
/// # Example
/// ```no_run
/// use structured_log_facade::app_identity;
/// use structured_log_facade::startup::StartupGuard;
///
/// # async fn serve() -> Result<(), std::io::Error> { Ok(()) }
/// #[tokio::main]
/// async fn main() {
///     let guard = StartupGuard::for_app(app_identity!()).unwrap();
///     if guard.run(serve()).await.is_err() {
///         std::process::exit(1);
///     }
/// }
/// ```
pub struct StartupGuard {
    logger: StartupLogger,
    options: StartupOptions,
    log_path: PathBuf,
}

impl StartupGuard {
    pub fn new(service_name: Option<&str>) -> Result<Self> {
        Self::with_log_dir(service_name, "logs")
    }

    /// Without a version; prefer [`StartupGuard::for_app`] when one is known
    pub fn with_log_dir(service_name: Option<&str>, log_dir: impl AsRef<Path>) -> Result<Self> {
        let service = service_name
            .map(str::to_string)
            .unwrap_or_else(default_service_name);
        Self::for_app_in(AppIdentity::new(service, ""), log_dir)
    }

    /// Bootstrap for `identity`, usually `app_identity!()`, so the banner
    /// carries the package version.
    pub fn for_app(identity: AppIdentity) -> Result<Self> {
        Self::for_app_in(identity, "logs")
    }

    pub fn for_app_in(identity: AppIdentity, log_dir: impl AsRef<Path>) -> Result<Self> {
        let identity = if identity.title.is_empty() {
            AppIdentity::new(default_service_name(), identity.version)
        } else {
            identity
        };
        let log_path = log_dir
            .as_ref()
            .join(format!("{}.start.log", identity.title));
        let env = EnvSettings::from_env();
        let options = StartupOptions::from_identity(&identity);

        let backend = Logger::builder()
            .min_level(LogLevel::Information)
            .appender(ConsoleAppender::new())
            .appender(FileAppender::new(log_path.to_string_lossy().to_string())?);
        let logger = StructuredLogger::builder(identity)
            .backend(backend)
            .env_settings(env.clone())
            .write_mode(WriteMode::Synchronous)
            .build()?;

        Ok(Self {
            logger: StartupLogger::for_environment(logger, &env),
            options,
            log_path,
        })
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.options.version = version.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: StartupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn logger(&self) -> &StartupLogger {
        &self.logger
    }

    pub fn options(&self) -> &StartupOptions {
        &self.options
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub async fn run<Fut, T, E>(&self, action: Fut) -> Result<T>
    where
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        guard_startup(&self.logger, &self.options, action).await
    }
}
