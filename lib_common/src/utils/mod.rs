//! # Utilities Module
//!
//! General-purpose helpers shared by the server binaries.
//!
//! - **`misc`**: process identity (`sys_info`), used to name log files and
//!   to stamp the startup banner.

#![forbid(unsafe_code)]

/// Miscellaneous helpers, currently process information.
pub mod misc;
