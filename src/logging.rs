//! Logging Module
//!
//! Structured logging with file output for diagnostics.

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with a daily rolling file under `log_dir`, plus the
/// console in debug builds or when `console` is set.
pub fn init(log_dir: &Path, console: bool) {
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "khigh.log");

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_appender);

    let console_layer = (console || cfg!(debug_assertions)).then(|| {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer);

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn default_filter() -> EnvFilter {
    #[cfg(debug_assertions)]
    { EnvFilter::new("debug,hyper=warn,reqwest=warn") }
    #[cfg(not(debug_assertions))]
    { EnvFilter::new("info,hyper=warn,reqwest=warn") }
}
