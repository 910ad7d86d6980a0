// src/logging.rs
use std::{
    fs::{self, OpenOptions},
    io,
    sync::Arc,
};

use thiserror::Error;
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{Config, LogFormat};

pub const ERROR_LOG_FILE: &str = "error.log";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open error log: {0}")]
    Io(#[from] io::Error),

    #[error("tracing subscriber already installed: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs [`subscriber`] as the global default.
pub fn init(config: &Config) -> Result<(), LoggingError> {
    subscriber(config)?.try_init()?;
    Ok(())
}

/// Console output honours `RUST_LOG`; ERROR events are also appended to
/// `<log_dir>/error.log`.
pub fn subscriber(config: &Config) -> Result<impl Subscriber + Send + Sync, LoggingError> {
    fs::create_dir_all(&config.log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join(ERROR_LOG_FILE))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = match config.log_format {
        LogFormat::Json => fmt::layer().json().with_filter(filter).boxed(),
        LogFormat::Pretty => fmt::layer().with_filter(filter).boxed(),
    };

    let error_file = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .with_filter(LevelFilter::ERROR);

    Ok(tracing_subscriber::registry().with(console).with(error_file))
}
