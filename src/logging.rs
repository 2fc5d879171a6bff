//! Process-wide log setup.
//!
//! Events go to stderr and, when `log_file` is set, are appended to that
//! file as plain text. `RUST_LOG` takes precedence over `log_level`.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(cfg: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    let file_layer = match &cfg.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()?;

    match &cfg.source {
        Some(path) => tracing::info!(path = %path.display(), "Loaded config"),
        None => tracing::debug!("No config file, using defaults"),
    }
    Ok(())
}
