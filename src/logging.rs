//! Tracing setup for applications embedding csvtie
//!
//! The library itself only emits events:
//! - `warn` for severed writes and clamped splices
//! - `error` for deferred rows that could not be written on drop
//! - `debug` for store indexing, syncs and splice reindex statistics
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=csvtie=debug` - all library diagnostics
//! - `RUST_LOG=csvtie::table=debug` - only splice/reindex events

use std::path::{Path, PathBuf};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const APP_DIR: &str = "csvtie";

/// `<cache dir>/csvtie/logs/`
pub fn default_logs_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR).join("logs"))
}

/// Initialize a console subscriber that respects RUST_LOG (default `warn`)
///
/// Returns false when a global subscriber was already installed.
pub fn init() -> bool {
    init_with_file(None)
}

/// Initialize console logging plus a daily-rotated `csvtie.log` in `logs_dir`
///
/// File logging uses debug level for more verbose troubleshooting.
pub fn init_with_file(logs_dir: Option<&Path>) -> bool {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // Console layer - respects RUST_LOG
    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    // File layer - always debug level for troubleshooting
    let file_layer = logs_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(dir, "csvtie.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false)
                    .with_target(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("csvtie=debug")),
            )
        }
        Err(e) => {
            eprintln!("Warning: Could not initialize file logging: {}", e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
}
