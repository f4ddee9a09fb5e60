//! Write metrics for a backend logger
//!
//! Counters describing what happened to records after they reached the
//! backend: written, filtered by the minimum level, failed in a sink, or
//! dropped by a buffering sink.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for logger observability
///
/// # Example
///
/// ```
/// use structured_log_facade::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_written();
/// metrics.record_failed();
///
/// assert_eq!(metrics.total_written(), 1);
/// assert_eq!(metrics.failed_writes(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records accepted by every appender
    total_written: AtomicU64,

    /// Records for which at least one appender failed or panicked
    failed_writes: AtomicU64,

    /// Records below the minimum level
    filtered: AtomicU64,

    /// Records discarded by a buffering sink
    dropped: AtomicU64,

    /// Times a buffering sink found its queue full
    queue_full_events: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            total_written: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    /// Returns the previous value, like the other `record_*` methods
    #[inline]
    pub fn record_written(&self) -> u64 {
        self.total_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    /// Failed writes as a percentage (0.0 - 100.0) of all attempted writes
    pub fn failure_rate(&self) -> f64 {
        let failed = self.failed_writes() as f64;
        let total = self.total_written() as f64 + failed;
        if total == 0.0 {
            0.0
        } else {
            (failed / total) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            total_written: AtomicU64::new(self.total_written()),
            failed_writes: AtomicU64::new(self.failed_writes()),
            filtered: AtomicU64::new(self.filtered()),
            dropped: AtomicU64::new(self.dropped()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
        }
    }
}
