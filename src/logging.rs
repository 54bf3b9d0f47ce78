use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "reckon=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("could not open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Explicit directive first, then `RUST_LOG`, then the default.
pub fn build_filter(directive: Option<&str>) -> EnvFilter {
    if let Some(directive) = directive {
        if let Ok(filter) = EnvFilter::try_new(directive) {
            return filter;
        }
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Subscriber appending plain-text events to `log_path`
pub fn file_subscriber(
    log_path: &Path,
    filter: EnvFilter,
) -> Result<impl Subscriber + Send + Sync + 'static, LoggingError> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    Ok(tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(false),
    ))
}

/// Install the global subscriber. Stdout belongs to the terminal UI, so
/// everything goes to the log file.
pub fn init(log_path: &Path, directive: Option<&str>) -> Result<(), LoggingError> {
    file_subscriber(log_path, build_filter(directive))?.try_init()?;
    Ok(())
}
