//! Appender implementations

pub mod buffered;
pub mod console;
pub mod file;
pub mod registry;

pub use buffered::{BufferedAppender, DEFAULT_BUFFER_SIZE};
pub use console::ConsoleAppender;
pub use file::FileAppender;
pub use registry::{parse_writer_specs, SinkArgs, SinkFactory, SinkRegistry, SinkSpec};

pub use crate::core::Appender;
