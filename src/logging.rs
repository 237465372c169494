//! File-based logging
//!
//! The terminal belongs to the UI, so tracing output goes to a daily-rotated
//! file under the configured log directory instead of stdout.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_FILE_PREFIX: &str = "jukebox-rs";
const LOG_FILE_SUFFIX: &str = "log";

/// Used when `RUST_LOG` is not set:
/// - `jukebox_rs` modules: DEBUG
/// - `reqwest`: INFO
/// - Other crates: WARN
const DEFAULT_FILTER: &str = "jukebox_rs=debug,reqwest=info,warn";

fn file_appender(log_dir: &Path) -> anyhow::Result<RollingFileAppender> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)
        .context("Failed to create log file appender")
}

/// Initialize the logging system.
///
/// Logs are written to `<log_dir>/jukebox-rs.YYYY-MM-DD.log`.
/// The returned guard flushes pending lines when dropped; keep it alive for
/// the lifetime of the application.
pub fn init_logging(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender(log_dir)?);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::info!(log_dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}

/// Log the outcome of a resolver call
#[macro_export]
macro_rules! log_resolve_result {
    ($track_id:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(track_id = %$track_id, "Resolver returned a url"),
            Err(e) => tracing::warn!(track_id = %$track_id, error = %e, "Resolver request failed"),
        }
    };
}

/// Log a resolver request with additional context
#[macro_export]
macro_rules! log_resolve_request {
    ($track_id:expr, $($field:tt)*) => {
        tracing::debug!(track_id = %$track_id, $($field)*, "Resolver request started");
    };
}
