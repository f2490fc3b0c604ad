//! Precondition checks run before a host starts real work.
use nix::unistd::Uid;
use tracing::error;

use crate::error::PreflightError;

/// Fails unless the effective uid is root.
pub fn require_root() -> Result<(), PreflightError> {
    check_root(Uid::effective())
}

fn check_root(euid: Uid) -> Result<(), PreflightError> {
    if euid.is_root() {
        return Ok(());
    }

    let err = PreflightError::NotRoot {
        euid: euid.as_raw(),
    };
    error!("{err}");
    Err(err)
}
