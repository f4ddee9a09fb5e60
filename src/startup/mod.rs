//! Startup logging: bootstrap → full logger lifecycle and the startup guard

pub mod guard;
pub mod lifecycle;

pub use guard::{
    default_service_name, guard_startup, StartupGuard, StartupOptions, DEFAULT_FAILURE_WAIT,
    ENV_INFO_ENV, FAILURE_WAIT_ENV, INTERACTIVE_WAIT_ENV,
};
pub use lifecycle::{StartupLogger, StartupPhase};
