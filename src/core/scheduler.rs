//! Write scheduling: inline or out-of-band physical writes
//!
//! Each facade owns one [`WriteScheduler`] whose [`WriteMode`] is fixed at
//! construction. In [`WriteMode::Concurrent`] every write is handed to its
//! own execution unit and the caller returns at once; writes may land out of
//! submission order. In [`WriteMode::Synchronous`] the write completes before
//! the caller returns and order is preserved.
//!
//! Tags are captured by value when a write is scheduled. The execution unit
//! re-establishes them as a scope around the backend call, so a deferred
//! write sees the tags that were active at submission, never the ones active
//! when it happens to run.

use super::log_context::LogContext;
use super::log_entry::LogEntry;
use super::logger::{panic_message, Logger};
use super::scope;
use crate::config::parse_bool;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Environment toggle; `false` selects synchronous writes
pub const SINGLE_THREAD_MODE_ENV: &str = "LOG_SINGLE_THREAD_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Caller returns immediately, write runs on its own execution unit
    #[default]
    Concurrent,
    /// Write completes before the caller returns
    Synchronous,
}

impl WriteMode {
    /// Read [`SINGLE_THREAD_MODE_ENV`]
    pub fn from_env() -> Self {
        Self::from_toggle(std::env::var(SINGLE_THREAD_MODE_ENV).ok().as_deref())
    }

    /// An explicit `false` turns concurrent scheduling off. Absent, `true`
    /// or unparsable values keep the concurrent default.
    pub fn from_toggle(value: Option<&str>) -> Self {
        match value.and_then(parse_bool) {
            Some(false) => WriteMode::Synchronous,
            _ => WriteMode::Concurrent,
        }
    }
}

/// A record plus the scope captured when it was scheduled.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub entry: LogEntry,
    pub scope: LogContext,
}

impl PendingWrite {
    pub fn new(entry: LogEntry, scope: LogContext) -> Self {
        Self { entry, scope }
    }

    /// Physical write: push the captured scope, emit, pop.
    fn execute(self, backend: &Logger) {
        let _guard = scope::push(self.scope);
        backend.emit(self.entry);
    }
}

#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn enter(self: &Arc<Self>) -> InFlightTicket {
        *self.count.lock() += 1;
        InFlightTicket(Arc::clone(self))
    }
}

/// Decrements the in-flight count when dropped, also while unwinding.
struct InFlightTicket(Arc<InFlight>);

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        let mut count = self.0.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.0.idle.notify_all();
        }
    }
}

pub struct WriteScheduler {
    mode: WriteMode,
    backend: Arc<Logger>,
    in_flight: Arc<InFlight>,
}

impl WriteScheduler {
    pub fn new(backend: Arc<Logger>, mode: WriteMode) -> Self {
        Self {
            mode,
            backend,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    pub fn backend(&self) -> &Arc<Logger> {
        &self.backend
    }

    /// Number of concurrent writes that have not finished yet
    pub fn pending(&self) -> usize {
        *self.in_flight.count.lock()
    }

    pub fn schedule(&self, write: PendingWrite) {
        match self.mode {
            WriteMode::Synchronous => write.execute(&self.backend),
            WriteMode::Concurrent => self.dispatch(write),
        }
    }

    fn dispatch(&self, write: PendingWrite) {
        let ticket = self.in_flight.enter();
        let backend = Arc::clone(&self.backend);
        let slot = Arc::new(Mutex::new(Some(write)));
        let job_slot = Arc::clone(&slot);

        let job = move || {
            let _ticket = ticket;
            if let Some(write) = job_slot.lock().take() {
                write.execute(&backend);
            }
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn_blocking(job);
            return;
        }

        if let Err(e) = thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(job)
        {
            eprintln!(
                "[LOGGER WARNING] Could not spawn log writer ({}), writing inline",
                e
            );
            // the job was dropped unrun, so the record is still in the slot
            let pending = slot.lock().take();
            if let Some(write) = pending {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    write.execute(&self.backend)
                }));
                if let Err(panic_info) = result {
                    eprintln!(
                        "[LOGGER ERROR] Inline fallback write panicked: {}",
                        panic_message(panic_info.as_ref())
                    );
                }
            }
        }
    }

    /// Wait until no concurrent write is in flight.
    ///
    /// Returns `false` if writes were still running when `timeout` elapsed.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            if self
                .in_flight
                .idle
                .wait_until(&mut count, deadline)
                .timed_out()
            {
                return *count == 0;
            }
        }
        true
    }
}
