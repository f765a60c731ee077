use std::path::{Path, PathBuf};
use std::{env, fmt};

use serde::{Deserialize, Serialize};

use thiserror::Error;

#[derive(Debug, Error)]
/// # Process Info Error
///
/// Failures while describing the running process.
pub enum ProcessInfoError {
    /// The executable path could not be read.
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    /// The executable path is not valid UTF-8 or has no file name.
    #[error("Invalid executable path: {0}")]
    InvalidPath(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// # Process Information
///
/// Identity of the running process, used to name log files and to stamp the
/// startup banner.
pub struct ProcessInfo {
    /// The full path to the current executable.
    pub process_current_exe: String,
    /// The base name of the executable (filename without extension).
    pub process_basename: String,
    /// The directory where the executable is located.
    pub process_location: String,
    /// The process ID (PID) of the current process.
    pub process_pid: u32,
    /// The hostname of the machine running the process, empty when unknown.
    pub process_host: String,
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (pid {}) on {} from {}",
            self.process_basename, self.process_pid, self.process_host, self.process_location,
        )
    }
}

/// # Get Process Information
///
/// Collects the executable path, basename, location, PID and hostname of the
/// current process. A hostname lookup failure is not an error; the field is
/// left empty.
pub fn get_process_info() -> Result<ProcessInfo, ProcessInfoError> {
    let current_exe: PathBuf = env::current_exe()?;
    let basename = get_process_basename(&current_exe)?;
    let location = get_process_location(&current_exe)?;
    let host = hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ProcessInfo {
        process_current_exe: current_exe.to_string_lossy().into_owned(),
        process_basename: basename,
        process_location: location,
        process_pid: std::process::id(),
        process_host: host,
    })
}

/// Filename of `exe_path` without its extension.
pub fn get_process_basename(exe_path: &Path) -> Result<String, ProcessInfoError> {
    exe_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_owned)
        .ok_or_else(|| ProcessInfoError::InvalidPath(exe_path.display().to_string()))
}

fn get_process_location(exe_path: &Path) -> Result<String, ProcessInfoError> {
    exe_path
        .parent()
        .and_then(|dir| dir.to_str())
        .map(str::to_owned)
        .ok_or_else(|| ProcessInfoError::InvalidPath(exe_path.display().to_string()))
}
