//! Two-phase startup logger: a minimal bootstrap logger that is replaced
//! exactly once by the fully configured one.

use crate::config::EnvSettings;
use crate::core::facade::{ErrorPayload, Log, StructuredLogger, DEFAULT_FLUSH_TIMEOUT};
use crate::core::{LoggerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    /// Minimal logger used before configuration is loaded
    Bootstrap,
    /// Fully configured logger
    Full,
}

impl fmt::Display for StartupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupPhase::Bootstrap => write!(f, "Bootstrap"),
            StartupPhase::Full => write!(f, "Full"),
        }
    }
}

struct State {
    phase: StartupPhase,
    logger: Arc<StructuredLogger>,
}

/// Cloneable handle to the process's current logger.
///
/// Clones share state: superseding through one handle is visible through
/// all of them.
#[derive(Clone)]
pub struct StartupLogger {
    state: Arc<RwLock<State>>,
}

impl StartupLogger {
    fn with_phase(logger: StructuredLogger, phase: StartupPhase) -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                phase,
                logger: Arc::new(logger),
            })),
        }
    }

    pub fn bootstrap(logger: StructuredLogger) -> Self {
        Self::with_phase(logger, StartupPhase::Bootstrap)
    }

    pub fn full(logger: StructuredLogger) -> Self {
        Self::with_phase(logger, StartupPhase::Full)
    }

    /// Start in `Full` in the testing environment, in `Bootstrap` otherwise
    pub fn for_environment(logger: StructuredLogger, env: &EnvSettings) -> Self {
        if env.is_testing() {
            Self::full(logger)
        } else {
            Self::bootstrap(logger)
        }
    }

    pub fn phase(&self) -> StartupPhase {
        self.state.read().phase
    }

    pub fn current(&self) -> Arc<StructuredLogger> {
        Arc::clone(&self.state.read().logger)
    }

    /// Replace the bootstrap logger with `full`.
    ///
    /// The bootstrap logger is drained and closed. Allowed once; in the
    /// `Full` phase this fails with [`LoggerError::InvalidTransition`] and
    /// `full` is dropped.
    pub fn supersede(&self, full: StructuredLogger) -> Result<()> {
        let previous = {
            let mut state = self.state.write();
            if state.phase == StartupPhase::Full {
                return Err(LoggerError::invalid_transition(
                    "startup logger already superseded by the full logger",
                ));
            }
            state.phase = StartupPhase::Full;
            std::mem::replace(&mut state.logger, Arc::new(full))
        };
        previous.close_and_flush(DEFAULT_FLUSH_TIMEOUT);
        Ok(())
    }

    /// Drain and close whichever logger is current
    pub fn close_and_flush(&self, timeout: Duration) -> bool {
        self.current().close_and_flush(timeout)
    }
}

impl fmt::Debug for StartupLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("StartupLogger")
            .field("phase", &state.phase)
            .field("identity", state.logger.identity())
            .finish()
    }
}

#[async_trait]
impl Log for StartupLogger {
    async fn write_info(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let logger = self.current();
        logger
            .write_info(component, process, context, message, timestamp)
            .await
    }

    async fn write_monitor(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let logger = self.current();
        logger
            .write_monitor(component, process, context, message, timestamp)
            .await
    }

    async fn write_warning(
        &self,
        component: &str,
        process: &str,
        context: &str,
        message: &str,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let logger = self.current();
        logger
            .write_warning(component, process, context, message, timestamp)
            .await
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
        let logger = self.current();
        logger
            .write_warning_error(component, process, context, message, error, timestamp)
            .await
    }

    async fn write_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let logger = self.current();
        logger
            .write_error(component, process, context, error, timestamp)
            .await
    }

    async fn write_fatal_error(
        &self,
        component: &str,
        process: &str,
        context: &str,
        error: ErrorPayload<'_>,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let logger = self.current();
        logger
            .write_fatal_error(component, process, context, error, timestamp)
            .await
    }
}
