use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

use super::file_io::open_file_for_append;
use crate::LogConfig;
use crate::Result;

pub const LOG_FILE_NAME: &str = "cluster-state.log";

/// `RUST_LOG` wins; otherwise the configured default directive applies.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.default_filter))
}

/// Installs the global subscriber writing to `<log_dir>/cluster-state.log`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the background writer.
pub fn init_observability(config: &LogConfig) -> Result<WorkerGuard> {
    let log_file = open_file_for_append(&config.log_dir.join(LOG_FILE_NAME))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(env_filter(config));
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
