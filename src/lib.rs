//! Procguard is a small toolkit of process-lifecycle primitives for command-line
//! programs on Unix-like systems. It provides leveled, flag-gated console output,
//! a single-instance check over the local process table, advisory lock files, and
//! graceful shutdown on SIGINT/SIGTERM. All guarantees are local to one host.

/// CLI interface.
pub mod cli;

/// Configuration management.
pub mod config;

/// Shared constants.
pub mod constants;

/// Error handling.
pub mod error;

/// Single-instance detection.
pub mod instance;

/// Advisory lock files.
pub mod lock;

/// Leveled console output.
pub mod logging;

/// Precondition checks.
pub mod preflight;

/// Graceful shutdown signals.
pub mod shutdown;

#[cfg(test)]
mod test_utils;

pub use error::{ConfigError, InstanceError, LockError, PreflightError, ShutdownError};
pub use instance::{InstanceGuard, check_single_instance, enforce_single_instance};
pub use lock::{LockFile, LockGuard};
pub use logging::{Level, LogConfiguration, LogSink};
pub use shutdown::{ShutdownSignal, ShutdownState};
