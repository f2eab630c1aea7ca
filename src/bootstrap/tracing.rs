//! Tracing configuration for Agora
//!
//! - **Development**: debug level for the workspace crates
//! - **Production**: info level
//! - **Environment filter**: `RUST_LOG` overrides the defaults

use std::io;

use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Default filter directives; HTTP internals stay quiet in both modes.
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let level = if is_dev { "debug" } else { "info" };
    vec![
        "info".to_string(),
        format!("agora={level}"),
        format!("ag_app={level}"),
        format!("ag_infra={level}"),
        "hyper=warn".to_string(),
        "hyper_util=warn".to_string(),
        "reqwest=warn".to_string(),
        "rustls=warn".to_string(),
    ]
}

/// Registers the global subscriber. Call once, before anything logs.
///
/// # Errors
///
/// Fails when a subscriber is already registered.
pub fn init_tracing_subscriber() -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    // stderr keeps stdout free for command output
    let writer: BoxMakeWriter = BoxMakeWriter::new(io::stderr);
    let fmt_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_level(true)
        .with_target(true)
        .with_file(is_development())
        .with_line_number(is_development())
        .with_ansi(cfg!(not(test)))
        .with_writer(writer);

    registry().with(env_filter).with(fmt_layer).try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_directives() {
        let dev = build_filter_directives(true);
        assert!(dev.contains(&"ag_app=debug".to_string()));
        assert!(dev.contains(&"ag_infra=debug".to_string()));
        assert!(dev.contains(&"reqwest=warn".to_string()));

        let prod = build_filter_directives(false);
        assert!(prod.contains(&"ag_app=info".to_string()));
        assert!(prod.contains(&"agora=info".to_string()));
        assert!(!prod.iter().any(|d| d.ends_with("=debug")));
    }

    #[test]
    fn test_directives_parse_as_env_filter() {
        let directives = build_filter_directives(true).join(",");
        assert!(tracing_subscriber::EnvFilter::try_new(directives).is_ok());
    }
}
