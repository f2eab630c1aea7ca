//! Infrastructure adapters for Agora.
//!
//! - [`http::HttpEventService`] implements every Event Service port over HTTP.
//! - [`config::load_config`] reads the TOML configuration file.

pub mod config;
pub mod http;

pub use config::load_config;
pub use http::HttpEventService;
