//! # Pure Data Module - Data Transfer Objects Only
//!
//! ## Responsibilities
//!
//! - Define configuration data structures
//! - Provide TOML → DTO mapping
//!
//! ## Prohibited
//!
//! - No validation logic in `from_toml`
//! - No I/O (the loader lives in `ag-infra`)
//!
//! Missing values map to empty facts; `with_defaults` is the single place
//! where empty facts are replaced by operating defaults.

use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_POLL_JITTER_MS: u64 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FALLBACK_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Application configuration DTO (pure data, no logic)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Event Service base URL, without trailing slash.
    pub api_base_url: String,

    /// Event detail poll interval.
    pub poll_interval_ms: u64,

    /// Upper bound of the random delay added to each poll tick.
    pub poll_jitter_ms: u64,

    pub request_timeout_ms: u64,

    /// Shown when the server gives no message of its own.
    pub fallback_error_message: String,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    ///
    /// ```toml
    /// [api]
    /// base_url = "https://agora.example.com"
    /// request_timeout_ms = 10000
    ///
    /// [polling]
    /// interval_ms = 5000
    /// jitter_ms = 500
    ///
    /// [messages]
    /// fallback_error = "Something went wrong."
    /// ```
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let section = |name: &str, key: &str| toml_value.get(name).and_then(|s| s.get(key));
        let as_u64 = |v: Option<&toml::Value>| {
            v.and_then(|v| v.as_integer())
                .map(|n| u64::try_from(n).unwrap_or(0))
                .unwrap_or(0)
        };

        Ok(Self {
            api_base_url: section("api", "base_url")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim_end_matches('/')
                .to_string(),
            poll_interval_ms: as_u64(section("polling", "interval_ms")),
            poll_jitter_ms: as_u64(section("polling", "jitter_ms")),
            request_timeout_ms: as_u64(section("api", "request_timeout_ms")),
            fallback_error_message: section("messages", "fallback_error")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        })
    }

    /// Create empty AppConfig (all empty/default values)
    pub fn empty() -> Self {
        Self {
            api_base_url: String::new(),
            poll_interval_ms: 0,
            poll_jitter_ms: 0,
            request_timeout_ms: 0,
            fallback_error_message: String::new(),
        }
    }

    /// Replaces empty facts by operating defaults.
    ///
    /// A jitter of zero is a legitimate choice and is kept.
    pub fn with_defaults(mut self) -> Self {
        if self.api_base_url.is_empty() {
            self.api_base_url = DEFAULT_API_BASE_URL.to_string();
        }
        if self.poll_interval_ms == 0 {
            self.poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
        }
        if self.request_timeout_ms == 0 {
            self.request_timeout_ms = DEFAULT_REQUEST_TIMEOUT_MS;
        }
        if self.fallback_error_message.is_empty() {
            self.fallback_error_message = DEFAULT_FALLBACK_ERROR_MESSAGE.to_string();
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_jitter(&self) -> Duration {
        Duration::from_millis(self.poll_jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_jitter_ms: DEFAULT_POLL_JITTER_MS,
            ..Self::empty().with_defaults()
        }
    }
}
