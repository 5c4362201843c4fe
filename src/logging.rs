use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "student-analytics.log";

/// Keeps the non-blocking file writer flushing; hold it for the life of the
/// process.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

/// Installs the global subscriber: stdout always, plus a daily-rolling file
/// when `file_log_dir` is given and can be created.
pub fn init_tracing(log_level: &str, file_log_dir: Option<&Path>) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    let file_setup = file_log_dir.map(|dir| std::fs::create_dir_all(dir).map(|_| dir));
    match file_setup {
        Some(Ok(dir)) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            tracing::info!(dir = %dir.display(), "file logging enabled");
            Some(FileLogGuard { _guard: guard })
        }
        Some(Err(err)) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            tracing::warn!("file logging disabled, could not create log directory: {}", err);
            None
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stdout_layer)
                .init();
            None
        }
    }
}
