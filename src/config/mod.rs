//! Configuration sources and sink resolution

pub mod configuration;
pub mod environment;
pub mod resolver;
pub mod settings;
pub mod substitution;

pub use configuration::{Configuration, ConfigurationBuilder, KEY_DELIMITER};
pub use environment::{parse_bool, EnvSettings, ENVIRONMENT_ENV, TESTING_ENVIRONMENT};
pub use resolver::{SinkResolver, DEFAULT_NAMESPACE};
pub use settings::LogSettings;
pub use substitution::SubstitutionTable;
