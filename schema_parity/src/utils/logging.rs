//! Logging utilities for schema_parity
//!
//! This module provides logging setup and configuration.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration.
///
/// Without a configuration, logs go to stderr at `info` unless `RUST_LOG`
/// says otherwise. Fails if a global subscriber is already installed.
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("schema_parity=info")),
                )
                .with_writer(std::io::stderr)
                .finish();
            return install(subscriber);
        }
    };

    let level = parse_level(&config.level);
    let directive = format!("schema_parity={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Mutex::new(File::create(file_path)?);

        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .with_writer(file);
        match (json, config.include_timestamps) {
            (true, _) => install(builder.json().finish()),
            (false, true) => install(builder.finish()),
            (false, false) => install(builder.without_time().finish()),
        }
    } else if config.stdout {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stdout);
        match (json, config.include_timestamps) {
            (true, _) => install(builder.json().finish()),
            (false, true) => install(builder.finish()),
            (false, false) => install(builder.without_time().finish()),
        }
    } else {
        // Reports own stdout
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr);
        match (json, config.include_timestamps) {
            (true, _) => install(builder.json().finish()),
            (false, true) => install(builder.finish()),
            (false, false) => install(builder.without_time().finish()),
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn install<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::ConfigError(format!("Failed to install log subscriber: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }
}
