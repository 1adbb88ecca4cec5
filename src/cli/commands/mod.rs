//! CLI command implementations
//!
//! Commands return a process exit code:
//! 0 success, 1 job failure, 2 configuration error, 5 fatal error,
//! 130 interrupted.

pub mod init;
pub mod process;
pub mod validate;
