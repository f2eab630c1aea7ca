//! Process start-up: logging, configuration, wiring and the CLI flows.

pub mod config;
pub mod run;
pub mod tracing;
pub mod wiring;

pub use config::{load_app_config, resolve_config_path};
pub use run::{run_events, run_watch, Credentials, WatchArgs};
pub use wiring::{wire_dependencies, AppRuntime};
