//! Shared plumbing for the server binaries: logging setup and process identity.

#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "utils")]
pub mod utils;

#[cfg(feature = "loggers")]
pub use loggers::loggerlocal::{LoggerError, LoggerLocal, LoggerLocalOptions};
#[cfg(feature = "utils")]
pub use utils::misc::sys_info::{ProcessInfo, ProcessInfoError, get_process_info};
