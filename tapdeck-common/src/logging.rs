//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence. Otherwise the configured level applies to
//! the tapdeck crates and everything else is held at `warn`.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Build the default filter directive for a configured level
pub fn default_directive(level: &str) -> Result<String> {
    let level = level.to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(Error::Config(format!("Unknown log level '{}'", level)));
    }
    Ok(format!("warn,tapdeck_common={level},tapdeck_player={level}"))
}

/// Install the global tracing subscriber
///
/// Fails if the level is unknown, the log file cannot be opened, or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let directive = default_directive(&config.level)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::Config(format!("Cannot open log file {:?}: {}", path, e)))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Tracing already initialised: {}", e)))
}
