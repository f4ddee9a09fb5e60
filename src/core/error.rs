//! Error types for the logging facade

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration could not be resolved into a sink topology
    #[error("Invalid configuration at '{key}': {message}")]
    Configuration { key: String, message: String },

    /// A severity value that has no native level
    #[error("Unmapped severity value: {value}")]
    Mapping { value: String },

    /// A physical write to a sink failed
    #[error("Sink '{sink}' failed to write: {message}")]
    SinkWrite { sink: String, message: String },

    /// Startup logger lifecycle misuse
    #[error("Invalid logger transition: {0}")]
    InvalidTransition(String),

    /// The guarded startup action failed
    #[error("Startup of '{service}' failed: {message}")]
    StartupFailed { service: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a mapping error for an unrecognized severity value
    pub fn mapping(value: impl ToString) -> Self {
        LoggerError::Mapping {
            value: value.to_string(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition<S: Into<String>>(msg: S) -> Self {
        LoggerError::InvalidTransition(msg.into())
    }

    pub fn startup_failed(service: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::StartupFailed {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error was raised while resolving configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, LoggerError::Configuration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("logging:writeTo:Name", "missing");
        assert!(matches!(err, LoggerError::Configuration { .. }));
        assert!(err.is_configuration());

        let err = LoggerError::mapping(6);
        assert!(matches!(err, LoggerError::Mapping { .. }));
        assert!(!err.is_configuration());

        let err = LoggerError::sink_write("file", "Permission denied");
        assert!(matches!(err, LoggerError::SinkWrite { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::config("logging:minimumLevel.default", "unknown level 'Loud'");
        assert_eq!(
            err.to_string(),
            "Invalid configuration at 'logging:minimumLevel.default': unknown level 'Loud'"
        );

        let err = LoggerError::mapping("None");
        assert_eq!(err.to_string(), "Unmapped severity value: None");

        let err = LoggerError::startup_failed("orders", "db unreachable");
        assert_eq!(err.to_string(), "Startup of 'orders' failed: db unreachable");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err =
            LoggerError::io_operation("opening log file", "cannot create logs/app.log", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("opening log file"));
        assert!(err.to_string().contains("cannot create logs/app.log"));
    }

    fn variant_name(err: &LoggerError) -> &'static str {
        match err {
            LoggerError::IoOperation { .. } => "IoOperation",
            LoggerError::IoError(_) => "IoError",
            LoggerError::JsonError(_) => "JsonError",
            LoggerError::Configuration { .. } => "Configuration",
            LoggerError::Mapping { .. } => "Mapping",
            LoggerError::SinkWrite { .. } => "SinkWrite",
            LoggerError::InvalidTransition(_) => "InvalidTransition",
            LoggerError::StartupFailed { .. } => "StartupFailed",
            LoggerError::Other(_) => "Other",
        }
    }

    #[test]
    fn test_every_variant_has_a_constructor() {
        let io = || std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let errors = [
            LoggerError::io_operation("writing", "app.log", io()),
            LoggerError::from(io()),
            LoggerError::from(json),
            LoggerError::config("logging:writeTo", "missing"),
            LoggerError::mapping(9),
            LoggerError::sink_write("file", "closed"),
            LoggerError::invalid_transition("twice"),
            LoggerError::startup_failed("orders", "boom"),
            LoggerError::other("misc"),
        ];

        let names: Vec<_> = errors.iter().map(variant_name).collect();
        assert_eq!(
            names,
            [
                "IoOperation",
                "IoError",
                "JsonError",
                "Configuration",
                "Mapping",
                "SinkWrite",
                "InvalidTransition",
                "StartupFailed",
                "Other",
            ]
        );
        assert!(errors.iter().all(|e| !e.to_string().is_empty()));
    }
}
