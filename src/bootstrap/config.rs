//! Configuration resolution.
//!
//! Precedence: `--config` / `AGORA_CONFIG`, then `agora.toml` in the working
//! directory, then built-in defaults. Empty values in the file are replaced by
//! the defaults after loading.

use std::path::{Path, PathBuf};

use tracing::info;

use ag_core::AppConfig;
use ag_infra::load_config;

pub const DEFAULT_CONFIG_FILE: &str = "agora.toml";

/// Explicit path wins; otherwise the default file if it exists in `cwd`.
pub fn resolve_config_path(explicit: Option<PathBuf>, cwd: &Path) -> Option<PathBuf> {
    explicit.or_else(|| {
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        candidate.is_file().then_some(candidate)
    })
}

/// # Errors
///
/// Fails when an explicitly resolved file cannot be read or parsed.
pub fn load_app_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Ok(load_config(path)?.with_defaults())
        }
        None => {
            info!("No configuration file, using defaults");
            Ok(AppConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "").unwrap();

        let explicit = PathBuf::from("/etc/agora/custom.toml");
        assert_eq!(
            resolve_config_path(Some(explicit.clone()), dir.path()),
            Some(explicit)
        );
    }

    #[test]
    fn test_default_file_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_config_path(None, dir.path()), None);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "").unwrap();
        assert_eq!(
            resolve_config_path(None, dir.path()),
            Some(dir.path().join(DEFAULT_CONFIG_FILE))
        );
    }

    #[test]
    fn test_loaded_config_gets_defaults_for_missing_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[polling]\ninterval_ms = 1500\n").unwrap();

        let config = load_app_config(Some(file.path())).unwrap();

        assert_eq!(config.poll_interval_ms, 1500);
        assert_eq!(config.api_base_url, AppConfig::default().api_base_url);
        assert!(!config.fallback_error_message.is_empty());
    }

    #[test]
    fn test_no_file_means_defaults() {
        assert_eq!(load_app_config(None).unwrap(), AppConfig::default());
    }
}
