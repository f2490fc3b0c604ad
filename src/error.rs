//! Error handling for procguard.
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by advisory lock-file operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock marker already exists; the existing claim was left untouched.
    #[error("Lock already held at {path:?}{}", owner_suffix(.owner))]
    AlreadyLocked {
        /// The marker path that was found.
        path: PathBuf,
        /// Owner recorded in the marker, when it could be read.
        owner: Option<String>,
    },

    /// A filesystem operation on the marker failed for any other reason.
    #[error("Lock file I/O failed for {path:?}: {source}")]
    Io {
        /// The marker path being operated on.
        path: PathBuf,
        /// The underlying error that occurred.
        #[source]
        source: std::io::Error,
    },
}

fn owner_suffix(owner: &Option<String>) -> String {
    match owner {
        Some(owner) => format!(" (owner {owner})"),
        None => String::new(),
    }
}

/// Errors raised while looking for competing instances.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// The process table could not be enumerated.
    #[error("Failed to scan process table: {0}")]
    ProcessScan(String),
}

/// Errors raised while wiring up graceful shutdown.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registering the signal handlers failed.
    #[error("Failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by precondition checks.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// The process is not running with an effective uid of 0.
    #[error("This program must be run as root (effective uid {euid})")]
    NotRoot {
        /// The effective uid that was observed.
        euid: u32,
    },
}

/// Errors raised while loading the host configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error reading or accessing a configuration file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Error parsing YAML configuration.
    #[error("Invalid YAML format: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration references an environment variable that is not set.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    /// A duration value could not be parsed.
    #[error("Invalid duration value: '{0}'")]
    InvalidDuration(String),
}
