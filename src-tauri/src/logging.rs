use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{backend_output::BackendStream, BACKEND_LOG_TARGET};

/// Keeps the file writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn resolve_desktop_log_path(root_dir: Option<PathBuf>, file_name: &str) -> PathBuf {
    root_dir
        .unwrap_or_else(std::env::temp_dir)
        .join("logs")
        .join(file_name)
}

fn open_log_file(log_path: &Path) -> Result<fs::File, String> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create desktop log directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|error| format!("Failed to open desktop log {}: {}", log_path.display(), error))
}

/// Installs stderr + file logging. Filter comes from `RUST_LOG`, default `info`.
pub fn init(log_path: &Path) -> LoggingGuard {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, file_guard, file_error) = match open_log_file(log_path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard), None)
        }
        Err(error) => (None, None, Some(error)),
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    if let Err(error) = installed {
        eprintln!("desktop logging already initialized: {error}");
    }
    if let Some(error) = file_error {
        tracing::warn!("{error}; logging to stderr only");
    }

    LoggingGuard {
        _file_guard: file_guard,
    }
}

pub fn append_desktop_log(message: &str) {
    tracing::info!(target: "desktop", "{message}");
}

pub fn append_startup_log(message: &str) {
    tracing::info!(target: "startup", "{message}");
}

pub fn append_shutdown_log(message: &str) {
    tracing::info!(target: "shutdown", "{message}");
}

pub fn format_backend_line(stream: BackendStream, line: &str) -> String {
    format!("{}: {}", stream.tag(), line)
}

/// Default sink for backend output.
pub fn relay_backend_line(stream: BackendStream, line: &str) {
    let message = format_backend_line(stream, line);
    match stream {
        BackendStream::Stdout => tracing::info!(target: BACKEND_LOG_TARGET, "{message}"),
        BackendStream::Stderr => tracing::error!(target: BACKEND_LOG_TARGET, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desktop_log_lives_under_root_logs_dir() {
        assert_eq!(
            resolve_desktop_log_path(Some(PathBuf::from("/data/openclaw")), "desktop.log"),
            PathBuf::from("/data/openclaw/logs/desktop.log")
        );
        assert_eq!(
            resolve_desktop_log_path(None, "desktop.log"),
            std::env::temp_dir().join("logs").join("desktop.log")
        );
    }

    #[test]
    fn backend_lines_keep_their_text_and_origin_tag() {
        assert_eq!(
            format_backend_line(BackendStream::Stdout, "  ready on :3000 "),
            "[Backend]:   ready on :3000 "
        );
        assert_eq!(
            format_backend_line(BackendStream::Stderr, "EADDRINUSE"),
            "[Backend Err]: EADDRINUSE"
        );
    }

    #[test]
    fn log_file_is_created_with_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path = dir.path().join("nested").join("logs").join("desktop.log");
        open_log_file(&log_path).expect("log file should open");
        assert!(log_path.is_file());
    }
}
