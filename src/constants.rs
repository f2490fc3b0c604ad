//! Constants shared by the lifecycle primitives and the host binary.
//!
//! This module centralizes the file-name conventions, exit statuses, escape codes
//! and timing defaults so the components agree on them.

use std::time::Duration;

// ============================================================================
// Lock Files
// ============================================================================

/// Suffix appended to a target path to form its advisory lock marker.
/// `/tmp/job` is guarded by `/tmp/job.lock`.
pub const LOCK_SUFFIX: &str = ".lock";

// ============================================================================
// Process Exit Status
// ============================================================================

/// Exit status used whenever a lifecycle check refuses to let the host proceed
/// (duplicate instance, held lock, failed precondition).
pub const EXIT_FAILURE: i32 = 1;

// ============================================================================
// Console Output
// ============================================================================

/// SGR code for error lines (red).
pub const ANSI_RED: &str = "\x1b[31m";

/// SGR code for warning lines (yellow).
pub const ANSI_YELLOW: &str = "\x1b[33m";

/// SGR code for debug lines (cyan).
pub const ANSI_CYAN: &str = "\x1b[36m";

/// SGR reset. Also used as the "default" color for verbose lines.
pub const ANSI_RESET: &str = "\x1b[0m";

// ============================================================================
// Host Loop Timing
// ============================================================================

/// Interval between shutdown polls in the host `watch` loop when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default configuration file looked up by the host binary.
pub const DEFAULT_CONFIG_FILE: &str = "procguard.yaml";
