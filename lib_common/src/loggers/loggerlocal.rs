use std::fs;
use std::path::{Path, PathBuf};

use glob::{Pattern, glob};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::utils::misc::sys_info::get_process_info;

#[derive(Debug, Error)]
/// # Logger Error
///
/// Failures while installing the global `tracing` subscriber.
pub enum LoggerError {
    /// The log directory could not be created or pruned.
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    /// Neither `RUST_LOG` nor the configured level is a valid filter.
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    /// The pattern used to find old log files is invalid.
    #[error("Invalid log file pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    /// Another global subscriber was installed first.
    #[error("Tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

#[derive(Debug, Clone)]
/// # Logger Local Options
///
/// Controls where log records go. Console output is human readable, file
/// output is one JSON object per line in a daily rolling file.
pub struct LoggerLocalOptions {
    /// Base name of the log files. Defaults to the process basename.
    pub app_name: Option<String>,
    /// Directory for the rolling log files.
    pub log_dir: PathBuf,
    /// Filter used when `RUST_LOG` is not set (e.g. "info", "server_gsi=debug").
    pub log_level: String,
    /// Print records to stdout.
    pub use_tty: bool,
    /// Write records to the rolling file in `log_dir`.
    pub use_file: bool,
    /// Number of most recent log files kept when the logger starts.
    pub keep_files: usize,
}

impl Default for LoggerLocalOptions {
    fn default() -> Self {
        Self {
            app_name: None,
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            use_tty: true,
            use_file: true,
            keep_files: 7,
        }
    }
}

/// Handle for the installed subscriber.
///
/// Holds the non-blocking writer guard; dropping it flushes and stops the
/// file writer, so keep it alive for the life of the process.
pub struct LoggerLocal {
    app_name: String,
    log_dir: PathBuf,
    _guard: Option<WorkerGuard>,
}

impl LoggerLocal {
    /// Installs the global `tracing` subscriber described by `options`.
    ///
    /// Old log files of the same application are pruned first so that at
    /// most `keep_files` remain next to the one opened now.
    pub fn init(options: LoggerLocalOptions) -> Result<Self, LoggerError> {
        let app_name = match options.app_name.clone() {
            Some(name) => name,
            None => get_process_info()
                .map(|info| info.process_basename)
                .unwrap_or_else(|_| "app".to_string()),
        };

        let env_filter = build_filter(&options.log_level)?;

        let console_layer = options
            .use_tty
            .then(|| fmt::layer().with_target(true).with_ansi(true));

        let mut guard = None;
        let file_layer = if options.use_file {
            fs::create_dir_all(&options.log_dir)?;
            rotate_logs(&app_name, &options.log_dir, options.keep_files)?;

            let file_appender = rolling::daily(&options.log_dir, format!("{}.log", app_name));
            let (writer, worker_guard) = non_blocking(file_appender);
            guard = Some(worker_guard);

            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .json(),
            )
        } else {
            None
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggerError::AlreadyInstalled(e.to_string()))?;

        tracing::info!(
            app = %app_name,
            log_dir = %options.log_dir.display(),
            level = %options.log_level,
            "Logging initialized"
        );

        Ok(Self {
            app_name,
            log_dir: options.log_dir,
            _guard: guard,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// `RUST_LOG` wins over the configured level.
pub fn build_filter(log_level: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(log_level).map_err(|e| LoggerError::InvalidFilter {
            filter: log_level.to_string(),
            reason: e.to_string(),
        })
    })
}

/// Deletes all but the `keep` newest log files of `app_name` in `log_dir`.
///
/// Rolling files are named `<app>.log.<yyyy-mm-dd>`, so ordering by file name
/// is ordering by age. Returns how many files were removed.
pub fn rotate_logs(app_name: &str, log_dir: &Path, keep: usize) -> Result<usize, LoggerError> {
    let pattern = format!(
        "{}/{}.log*",
        Pattern::escape(&log_dir.to_string_lossy()),
        Pattern::escape(app_name)
    );

    let mut log_files: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).collect();
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for old_file in log_files.iter().skip(keep) {
        match fs::remove_file(old_file) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Error deleting old log file {}: {}", old_file.display(), e),
        }
    }

    Ok(removed)
}
