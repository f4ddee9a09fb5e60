//! Integration tests for the logging facade
//!
//! These tests verify:
//! - Configuration-driven resolution with placeholder substitution
//! - Fail-fast resolution errors
//! - Overload parity and empty-message fallback
//! - Scoped tags across threads and tasks, and on deferred writes
//! - Ordering in synchronous mode, delivery in concurrent mode
//! - The guarded startup routine

use parking_lot::{Condvar, Mutex};
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use structured_log_facade::prelude::*;
use structured_log_facade::scope;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<LogEntry>>>);

impl Capture {
    fn entries(&self) -> Vec<LogEntry> {
        self.0.lock().clone()
    }

    fn messages(&self) -> Vec<String> {
        self.0.lock().iter().map(|e| e.message.clone()).collect()
    }
}

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

fn capture_logger(capture: &Capture, mode: WriteMode) -> StructuredLogger {
    StructuredLogger::builder(AppIdentity::new("svc", "1.4.2"))
        .backend(
            Logger::builder()
                .min_level(LogLevel::Verbose)
                .appender(capture.clone()),
        )
        .env_settings(EnvSettings::default().with_environment("Staging"))
        .write_mode(mode)
        .build()
        .expect("Failed to build logger")
}

#[tokio::test]
async fn test_configured_file_target_with_substitution() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path_format = temp_dir.path().join("logs").join("{LogName}.log");
    let config_text = serde_json::json!({
        "logging": {
            "MinimumLevel": "Information",
            "writeTo": {
                "Name": "JsonFile",
                "Args": { "path": path_format.to_string_lossy() }
            },
            "Properties": {
                "Application": "svc",
                "LogName": "{LogName}"
            }
        }
    })
    .to_string();

    let config = ConfigurationBuilder::new()
        .add_json_str(config_text)
        .build()
        .expect("Failed to build configuration");
    let substitutions = SubstitutionTable::new()
        .with("{LogName}", "orders")
        .expect("Failed to bind token");

    let logger = StructuredLogger::builder(AppIdentity::new("orders-api", "3.0.1"))
        .configuration(config)
        .substitutions(substitutions)
        .env_settings(EnvSettings::default())
        .write_mode(WriteMode::Synchronous)
        .build()
        .expect("Failed to build logger");

    logger
        .write_info("api", "checkout", "order-42", "Order accepted", None)
        .await;
    logger
        .write_monitor("api", "checkout", "order-42", "Filtered out", None)
        .await;
    assert!(logger.close_and_flush(Duration::from_secs(1)));

    let log_file = temp_dir.path().join("logs").join("orders.log");
    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    let records: Vec<serde_json::Value> = content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSON line"))
        .collect();

    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record["AppName"], "svc");
        assert_eq!(record["LogName"], "orders");
        assert_eq!(record["Version"], "3.0.1");
    }
    assert_eq!(records[0]["Msg"], "Started logging.");
    assert_eq!(records[1]["Msg"], "Order accepted");
    assert_eq!(records[1]["Component"], "api");
    assert_eq!(records[1]["Context"], "order-42");
}

#[test]
fn test_unknown_write_target_fails_fast() {
    let config = Configuration::from_pairs([
        ("logging:MinimumLevel", "Information"),
        ("logging:writeTo:Name", "Carrier-Pigeon"),
    ]);

    let err = StructuredLogger::builder(AppIdentity::new("svc", "1.0"))
        .configuration(config)
        .env_settings(EnvSettings::default())
        .build()
        .err()
        .expect("Unknown write target must fail");
    assert!(err.is_configuration());
    assert!(err.to_string().contains("Carrier-Pigeon"));
}

#[test]
fn test_missing_minimum_level_fails_fast() {
    let config = Configuration::from_pairs([("logging:writeTo:Name", "Console")]);
    let err = StructuredLogger::builder(AppIdentity::new("svc", "1.0"))
        .configuration(config)
        .env_settings(EnvSettings::default())
        .build()
        .err()
        .expect("Missing minimum level must fail");
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_process_overloads_match_full_form() {
    let capture = Capture::default();
    let logger = capture_logger(&capture, WriteMode::Synchronous);
    let failure = io::Error::new(io::ErrorKind::TimedOut, "upstream timed out");

    logger.write_process_info("sync", "batch-1", "Imported", None).await;
    logger.write_info("", "sync", "batch-1", "Imported", None).await;
    logger.write_process_error("sync", "batch-1", &failure, None).await;
    logger.write_error("", "sync", "batch-1", &failure, None).await;

    let entries = capture.entries();
    assert_eq!(entries.len(), 5);
    for pair in entries[1..].chunks(2) {
        assert_eq!(pair[0].level, pair[1].level);
        assert_eq!(pair[0].message, pair[1].message);
        assert_eq!(pair[0].properties, pair[1].properties);
    }
    assert_eq!(entries[1].property("Component"), Some(""));
}

#[tokio::test]
async fn test_error_summary_replaces_empty_message() {
    let capture = Capture::default();
    let logger = capture_logger(&capture, WriteMode::Synchronous);
    let failure = io::Error::new(io::ErrorKind::NotFound, "config file missing");

    logger
        .write_warning_error("cfg", "load", "boot", "", &failure, None)
        .await;
    logger
        .write_fatal_error("cfg", "load", "boot", &failure, None)
        .await;

    let entries = capture.entries();
    assert_eq!(entries[1].level, LogLevel::Warning);
    assert_eq!(entries[1].message, "config file missing");
    assert_eq!(entries[2].level, LogLevel::Fatal);
    assert_eq!(entries[2].message, "config file missing");
    assert!(entries[2].error.is_some());
}

#[test]
fn test_scoped_tags_stay_on_their_thread() {
    let capture = Capture::default();
    let logger = Arc::new(capture_logger(&capture, WriteMode::Synchronous));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let logger = Arc::clone(&logger);
            std::thread::spawn(move || {
                let _guard = scope::push_property("Worker", i as i64);
                logger.write(
                    LogLevel::Information,
                    CallTags::new("pool", "job", ""),
                    Some(&format!("job from {}", i)),
                    None,
                    None,
                );
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("Worker panicked");
    }
    logger.write(
        LogLevel::Information,
        CallTags::default(),
        Some("outside"),
        None,
        None,
    );

    let entries = capture.entries();
    for entry in entries.iter().filter(|e| e.message.starts_with("job from")) {
        let worker = entry
            .properties
            .get("Worker")
            .expect("Worker tag missing")
            .to_string();
        assert_eq!(entry.message, format!("job from {}", worker));
    }
    let outside = entries.iter().find(|e| e.message == "outside").unwrap();
    assert!(outside.properties.get("Worker").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scoped_tags_follow_spawned_tasks() {
    let capture = Capture::default();
    let logger = Arc::new(capture_logger(&capture, WriteMode::Concurrent));

    let tasks: Vec<_> = ["alpha", "beta"]
        .into_iter()
        .map(|tenant| {
            let logger = Arc::clone(&logger);
            let frame = LogContext::new().with_field("Tenant", tenant);
            tokio::spawn(
                async move {
                    tokio::task::yield_now().await;
                    logger
                        .write_info("api", "request", "", &format!("hello {}", tenant), None)
                        .await;
                }
                .with_log_scope(frame),
            )
        })
        .collect();
    for task in tasks {
        task.await.expect("Task panicked");
    }
    assert!(logger.close_and_flush(Duration::from_secs(5)));

    for entry in capture.entries().iter().filter(|e| e.message.starts_with("hello")) {
        let tenant = entry.property("Tenant").expect("Tenant tag missing");
        assert_eq!(entry.message, format!("hello {}", tenant));
    }
}

/// Holds every append until the gate opens
#[derive(Clone)]
struct Gated {
    capture: Capture,
    open: Arc<(Mutex<bool>, Condvar)>,
}

impl Gated {
    fn closed(capture: &Capture) -> Self {
        Self {
            capture: capture.clone(),
            open: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    fn release(&self) {
        let (lock, cvar) = &*self.open;
        *lock.lock() = true;
        cvar.notify_all();
    }
}

impl Appender for Gated {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        {
            let (lock, cvar) = &*self.open;
            let mut open = lock.lock();
            while !*open {
                cvar.wait(&mut open);
            }
        }
        self.capture.append(entry)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "gated"
    }
}

#[test]
fn test_deferred_writes_keep_the_scope_of_their_call() {
    let capture = Capture::default();
    let gate = Gated::closed(&capture);
    let logger = StructuredLogger::builder(AppIdentity::new("svc", "1.4.2"))
        .backend(
            Logger::builder()
                .min_level(LogLevel::Verbose)
                .appender(gate.clone()),
        )
        .env_settings(EnvSettings::default())
        .write_mode(WriteMode::Concurrent)
        .build()
        .expect("Failed to build logger");

    {
        let _outer = scope::push_property("Tenant", "acme");
        let _inner = scope::push_property("Request", "r-1");
        logger.write(
            LogLevel::Information,
            CallTags::new("api", "request", ""),
            Some("inside"),
            None,
            None,
        );
    }
    logger.write(
        LogLevel::Information,
        CallTags::new("api", "request", ""),
        Some("after"),
        None,
        None,
    );

    // nothing has reached the sink while the scope was being torn down
    assert!(capture.messages().is_empty());
    gate.release();
    assert!(logger.close_and_flush(Duration::from_secs(5)));

    let entries = capture.entries();
    let inside = entries.iter().find(|e| e.message == "inside").unwrap();
    assert_eq!(inside.property("Tenant"), Some("acme"));
    assert_eq!(inside.property("Request"), Some("r-1"));

    let after = entries.iter().find(|e| e.message == "after").unwrap();
    assert!(after.properties.get("Tenant").is_none());
    assert!(after.properties.get("Request").is_none());
    assert_eq!(scope::depth(), 0);
}

#[tokio::test]
async fn test_synchronous_mode_preserves_order() {
    let capture = Capture::default();
    let logger = capture_logger(&capture, WriteMode::Synchronous);

    for i in 0..20 {
        logger
            .write_info("seq", "loop", "", &format!("step {}", i), None)
            .await;
    }

    let expected: Vec<String> = std::iter::once("Started logging.".to_string())
        .chain((0..20).map(|i| format!("step {}", i)))
        .collect();
    assert_eq!(capture.messages(), expected);
}

#[test]
fn test_concurrent_mode_delivers_everything() {
    let capture = Capture::default();
    let logger = capture_logger(&capture, WriteMode::Concurrent);

    for i in 0..100 {
        logger.write(
            LogLevel::Information,
            CallTags::new("bulk", "fan-out", ""),
            Some(&format!("record {}", i)),
            None,
            None,
        );
    }
    assert!(logger.close_and_flush(Duration::from_secs(5)));

    let mut messages = capture.messages();
    messages.sort();
    assert_eq!(messages.len(), 101);
    assert!(messages.contains(&"record 99".to_string()));
    assert_eq!(logger.backend().metrics().total_written(), 101);
}

#[test]
fn test_writes_after_close_are_ignored() {
    let capture = Capture::default();
    let logger = capture_logger(&capture, WriteMode::Synchronous);

    assert!(logger.close_and_flush(Duration::from_secs(1)));
    logger.write(
        LogLevel::Error,
        CallTags::default(),
        Some("too late"),
        None,
        None,
    );

    assert_eq!(capture.messages(), vec!["Started logging.".to_string()]);
}

#[tokio::test]
async fn test_startup_guard_writes_start_log() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let guard = StartupGuard::with_log_dir(Some("billing"), temp_dir.path())
        .expect("Failed to create guard")
        .with_version("5.2.0")
        .with_options(
            StartupOptions::new("billing", "5.2.0")
                .with_env_info("region=eu-west")
                .with_interactive_wait(false),
        );

    let value = guard
        .run(async { Ok::<_, io::Error>(7) })
        .await
        .expect("Startup action failed");
    assert_eq!(value, 7);

    let content = fs::read_to_string(temp_dir.path().join("billing.start.log"))
        .expect("Failed to read start log");
    assert!(content.contains("billing version 5.2.0"));
    assert!(content.contains("ENV_INFO: region=eu-west"));
}

#[tokio::test]
async fn test_startup_guard_reports_failure() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let guard = StartupGuard::with_log_dir(Some("billing"), temp_dir.path())
        .expect("Failed to create guard")
        .with_options(
            StartupOptions::new("billing", "")
                .with_failure_wait(Duration::ZERO)
                .with_interactive_wait(false),
        );

    let err = guard
        .run(async {
            Err::<(), _>(io::Error::new(io::ErrorKind::AddrInUse, "port 8080 taken"))
        })
        .await
        .unwrap_err();

    match err {
        LoggerError::StartupFailed { service, message } => {
            assert_eq!(service, "billing");
            assert_eq!(message, "port 8080 taken");
        }
        other => panic!("unexpected error: {}", other),
    }

    let content = fs::read_to_string(temp_dir.path().join("billing.start.log"))
        .expect("Failed to read start log");
    assert!(content.contains("Host terminated unexpectedly"));
    assert!(content.trim_end().ends_with("Terminated"));
}
