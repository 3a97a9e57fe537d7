//! Tracing subscriber setup.
//!
//! Verbosity comes from `RUST_LOG` (default `vfkit=info`). With a log
//! directory, events also go to `<dir>/vfkit.log` through a non-blocking
//! writer; keep the returned guard alive until exit so buffered lines are
//! flushed.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vfkit_shared::errors::VfkitResult;

const DEFAULT_FILTER: &str = "vfkit=info";
const LOG_FILE_NAME: &str = "vfkit.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Call once, from `main`.
pub fn init_logging(log_dir: Option<&Path>) -> VfkitResult<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();

            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .init();

            None
        }
    };

    Ok(guard)
}
