//! Tracing setup.
//!
//! One-shot commands log to stderr. The dashboard owns the terminal, so it
//! logs to a file next to the configuration file instead.

use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "jira-cli.log";

/// Where log output goes.
#[derive(Debug, Clone, PartialEq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Log file used by the dashboard, placed beside the configuration file.
pub fn log_file_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_FILE_NAME)
}

/// Open `path` for appending. Never creates missing directories.
fn open_log_file(path: &Path) -> io::Result<RollingFileAppender> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("log directory {} does not exist", dir.display()),
        ));
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(LOG_FILE_NAME);

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
}

/// Initialise logging. `RUST_LOG` overrides the default level, which is
/// `debug` with `--verbose` and `warn` otherwise.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the lifetime of the process. A log file that cannot be opened disables
/// logging with a warning instead of failing the command.
pub fn init(verbose: bool, target: LogTarget) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match target {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .try_init();
            None
        }
        LogTarget::File(path) => {
            let (writer, guard) = match open_log_file(&path) {
                Ok(appender) => tracing_appender::non_blocking(appender),
                Err(err) => {
                    eprintln!(
                        "{} Logging disabled, cannot open {}: {}",
                        "!".yellow().bold(),
                        path.display(),
                        err
                    );
                    tracing_appender::non_blocking(io::sink())
                }
            };
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
    }
}
