//! Buffering wrapper that moves physical writes onto a worker thread
//!
//! Records are queued on a bounded channel and written in batches by a
//! dedicated worker. When the queue is full the [`OverflowPolicy`] decides
//! what happens; Error and Fatal records are never dropped and are written
//! synchronously instead.

use crate::core::logger::panic_message;
use crate::core::{
    Appender, LogEntry, LoggerError, LoggerMetrics, LogPriority, OverflowCallback,
    OverflowPolicy, Result,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default queue capacity
pub const DEFAULT_BUFFER_SIZE: usize = 10_000;

const BATCH_SIZE: usize = 50;
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

type Inner = Arc<Mutex<Vec<Box<dyn Appender>>>>;

enum Command {
    Write(LogEntry),
    Flush(Sender<()>),
}

pub struct BufferedAppender {
    name: String,
    inner: Inner,
    sender: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    capacity: usize,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    metrics: Arc<LoggerMetrics>,
}

impl BufferedAppender {
    pub fn new(inner: Vec<Box<dyn Appender>>) -> Result<Self> {
        Self::with_config(inner, DEFAULT_BUFFER_SIZE, OverflowPolicy::default(), None)
    }

    pub fn with_config(
        inner: Vec<Box<dyn Appender>>,
        capacity: usize,
        overflow_policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
    ) -> Result<Self> {
        let capacity = capacity.max(1);
        let name = format!(
            "buffered({})",
            inner
                .iter()
                .map(|a| a.name().to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        let inner: Inner = Arc::new(Mutex::new(inner));
        let metrics = Arc::new(LoggerMetrics::new());
        let (sender, receiver) = bounded(capacity);

        let worker_inner = Arc::clone(&inner);
        let worker_metrics = Arc::clone(&metrics);
        let worker = thread::Builder::new()
            .name("log-buffer".to_string())
            .spawn(move || Self::run_worker(receiver, worker_inner, worker_metrics))
            .map_err(|e| LoggerError::io_operation("spawning buffer worker", name.clone(), e))?;

        Ok(Self {
            name,
            inner,
            sender: Some(sender),
            worker: Some(worker),
            capacity,
            overflow_policy,
            on_overflow,
            metrics,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflow_policy(&self) -> &OverflowPolicy {
        &self.overflow_policy
    }

    /// Counters of this buffer: written, failed, dropped, queue-full events
    pub fn metrics(&self) -> Arc<LoggerMetrics> {
        Arc::clone(&self.metrics)
    }

    fn run_worker(receiver: Receiver<Command>, inner: Inner, metrics: Arc<LoggerMetrics>) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);

        // recv fails only once every sender is gone and the queue is drained
        while let Ok(command) = receiver.recv() {
            let mut pending = Some(command);
            while let Some(command) = pending.take() {
                match command {
                    Command::Write(entry) => batch.push(entry),
                    Command::Flush(ack) => {
                        Self::write_batch(&inner, &mut batch, &metrics);
                        Self::flush_inner(&inner);
                        let _ = ack.send(());
                    }
                }
                if batch.len() < BATCH_SIZE {
                    pending = receiver.try_recv().ok();
                }
            }
            Self::write_batch(&inner, &mut batch, &metrics);
        }

        Self::write_batch(&inner, &mut batch, &metrics);
        Self::flush_inner(&inner);
    }

    fn write_batch(inner: &Inner, batch: &mut Vec<LogEntry>, metrics: &LoggerMetrics) {
        if batch.is_empty() {
            return;
        }
        let mut appenders = inner.lock();
        for entry in batch.drain(..) {
            Self::write_one(&mut appenders, &entry, metrics);
        }
    }

    fn write_one(appenders: &mut [Box<dyn Appender>], entry: &LogEntry, metrics: &LoggerMetrics) {
        let mut has_error = false;
        for appender in appenders.iter_mut() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                appender.append(entry)
            }));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    eprintln!(
                        "[LOGGER ERROR] Buffered appender '{}' failed: {}",
                        appender.name(),
                        e
                    );
                    has_error = true;
                }
                Err(panic_info) => {
                    eprintln!(
                        "[LOGGER CRITICAL] Buffered appender '{}' panicked: {}",
                        appender.name(),
                        panic_message(panic_info.as_ref())
                    );
                    has_error = true;
                }
            }
        }
        if has_error {
            metrics.record_failed();
        } else {
            metrics.record_written();
        }
    }

    fn flush_inner(inner: &Inner) {
        for appender in inner.lock().iter_mut() {
            if let Err(e) = appender.flush() {
                eprintln!(
                    "[LOGGER ERROR] Failed to flush buffered appender '{}': {}",
                    appender.name(),
                    e
                );
            }
        }
    }

    fn handle_overflow(&self, sender: &Sender<Command>, entry: LogEntry) {
        self.metrics.record_queue_full();

        if LogPriority::of(entry.level) == LogPriority::Critical {
            let mut appenders = self.inner.lock();
            Self::write_one(&mut appenders, &entry, &self.metrics);
            return;
        }

        match &self.overflow_policy {
            OverflowPolicy::DropNewest => {
                self.metrics.record_dropped();
            }
            OverflowPolicy::Block => {
                let _ = sender.send(Command::Write(entry));
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                if let Err(SendTimeoutError::Timeout(_)) =
                    sender.send_timeout(Command::Write(entry), *timeout)
                {
                    self.alert_and_drop();
                }
            }
            OverflowPolicy::AlertAndDrop => self.alert_and_drop(),
        }
    }

    fn alert_and_drop(&self) {
        let dropped_count = self.metrics.record_dropped() + 1;

        // first drop and every thousandth after it
        if dropped_count == 1 || dropped_count % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Buffer of '{}' full, {} records dropped. \
                 Consider increasing bufferSize or using the Block policy.",
                self.name, dropped_count
            );
            if let Some(ref callback) = self.on_overflow {
                callback(dropped_count);
            }
        }
    }
}

impl Appender for BufferedAppender {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        let Some(sender) = self.sender.clone() else {
            return Err(LoggerError::sink_write(&self.name, "buffer already shut down"));
        };

        match sender.try_send(Command::Write(entry.clone())) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(Command::Write(entry))) => {
                self.handle_overflow(&sender, entry);
                Ok(())
            }
            Err(TrySendError::Full(Command::Flush(_))) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::sink_write(
                &self.name,
                "buffer worker stopped",
            )),
        }
    }

    /// Wait until everything queued so far has been written and flushed
    fn flush(&mut self) -> Result<()> {
        let Some(ref sender) = self.sender else {
            return Ok(());
        };
        let (ack_tx, ack_rx) = bounded(1);
        sender
            .send_timeout(Command::Flush(ack_tx), FLUSH_TIMEOUT)
            .map_err(|_| LoggerError::sink_write(&self.name, "flush request timed out"))?;
        ack_rx
            .recv_timeout(FLUSH_TIMEOUT)
            .map_err(|_| LoggerError::sink_write(&self.name, "flush did not complete in time"))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for BufferedAppender {
    fn drop(&mut self) {
        // closing the channel lets the worker drain what is queued and exit
        drop(self.sender.take());

        if let Some(handle) = self.worker.take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Buffer worker panicked during shutdown: {:?}",
                            e
                        );
                    }
                    break;
                }
                if start.elapsed() >= SHUTDOWN_TIMEOUT {
                    eprintln!(
                        "[LOGGER WARNING] Buffer worker did not finish within {:?}. \
                         Some records may be lost.",
                        SHUTDOWN_TIMEOUT
                    );
                    break;
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    impl Appender for Capture {
        fn append(&mut self, entry: &LogEntry) -> Result<()> {
            self.0.lock().push(entry.message.clone());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "capture"
        }
    }

    /// Blocks every write until the gate is opened
    #[derive(Clone)]
    struct Gated {
        gate: Arc<(Mutex<bool>, parking_lot::Condvar)>,
        entered: Arc<AtomicUsize>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Gated {
        fn new() -> Self {
            Self {
                gate: Arc::new((Mutex::new(false), parking_lot::Condvar::new())),
                entered: Arc::default(),
                seen: Arc::default(),
            }
        }

        fn open(&self) {
            *self.gate.0.lock() = true;
            self.gate.1.notify_all();
        }

        fn wait_entered(&self) {
            while self.entered.load(Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    impl Appender for Gated {
        fn append(&mut self, entry: &LogEntry) -> Result<()> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let mut open = self.gate.0.lock();
            while !*open {
                self.gate.1.wait(&mut open);
            }
            self.seen.lock().push(entry.message.clone());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "gated"
        }
    }

    #[test]
    fn test_flush_drains_queue() -> Result<()> {
        let capture = Capture::default();
        let mut buffered = BufferedAppender::new(vec![Box::new(capture.clone())])?;
        assert_eq!(buffered.name(), "buffered(capture)");

        for i in 0..200 {
            buffered.append(&LogEntry::new(LogLevel::Information, format!("m{}", i)))?;
        }
        buffered.flush()?;

        let seen = capture.0.lock();
        assert_eq!(seen.len(), 200);
        assert_eq!(seen[0], "m0");
        assert_eq!(seen[199], "m199");
        Ok(())
    }

    #[test]
    fn test_drop_drains_queue() -> Result<()> {
        let capture = Capture::default();
        {
            let mut buffered = BufferedAppender::new(vec![Box::new(capture.clone())])?;
            for i in 0..50 {
                buffered.append(&LogEntry::new(LogLevel::Debug, format!("m{}", i)))?;
            }
        }
        assert_eq!(capture.0.lock().len(), 50);
        Ok(())
    }

    #[test]
    fn test_alert_and_drop_when_full() -> Result<()> {
        let gated = Gated::new();
        let alerts = Arc::new(AtomicU64::new(0));
        let alerts_clone = Arc::clone(&alerts);
        let mut buffered = BufferedAppender::with_config(
            vec![Box::new(gated.clone())],
            1,
            OverflowPolicy::AlertAndDrop,
            Some(Arc::new(move |count| alerts_clone.store(count, Ordering::SeqCst))),
        )?;

        // park the worker inside the first write, then fill the single slot
        buffered.append(&LogEntry::new(LogLevel::Information, "m0"))?;
        gated.wait_entered();
        for i in 1..10 {
            buffered.append(&LogEntry::new(LogLevel::Information, format!("m{}", i)))?;
        }
        let metrics = buffered.metrics();
        assert_eq!(metrics.dropped(), 8);
        assert_eq!(metrics.queue_full_events(), 8);
        assert_eq!(alerts.load(Ordering::SeqCst), 1);

        gated.open();
        buffered.flush()?;
        assert_eq!(*gated.seen.lock(), vec!["m0".to_string(), "m1".to_string()]);
        Ok(())
    }

    #[test]
    fn test_critical_records_are_never_dropped() -> Result<()> {
        let capture = Capture::default();
        let gated = Gated::new();
        let mut buffered = BufferedAppender::with_config(
            vec![Box::new(gated.clone()), Box::new(capture.clone())],
            1,
            OverflowPolicy::DropNewest,
            None,
        )?;

        buffered.append(&LogEntry::new(LogLevel::Information, "info0"))?;
        gated.wait_entered();
        for i in 1..5 {
            buffered.append(&LogEntry::new(LogLevel::Information, format!("info{}", i)))?;
        }
        assert_eq!(buffered.metrics().dropped(), 3);

        let opener = {
            let gated = gated.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                gated.open();
            })
        };
        // queue is still full: the fatal record waits for the worker instead of dropping
        buffered.append(&LogEntry::new(LogLevel::Fatal, "fatal"))?;
        buffered.flush()?;
        opener.join().unwrap();

        assert!(capture.0.lock().contains(&"fatal".to_string()));
        assert_eq!(buffered.metrics().dropped(), 3);
        Ok(())
    }
}
