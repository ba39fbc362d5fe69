use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter,
};

/// Installs the global subscriber: human-readable output on stdout and, when
/// `log_file` is given, a plain copy in that file.
///
/// The returned guard flushes the file writer and must live as long as the program.
pub fn setup_logging(log_file: Option<&Path>, verbose: bool) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stdout_layer = fmt::layer().with_target(false).with_timer(SystemTime);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path.file_name().context("Log file path has no file name")?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create {}", directory.display()))?;

            let file_appender = RollingFileAppender::new(Rotation::NEVER, directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(true)
                .with_level(true)
                .with_timer(SystemTime)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    if let Some(path) = log_file {
        tracing::debug!("Logging to {}", path.display());
    }

    Ok(guard)
}
