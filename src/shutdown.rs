//! Graceful shutdown on SIGINT and SIGTERM.
//!
//! Installing a [`ShutdownSignal`] replaces the default "terminate now" disposition of
//! both signals with a handler that only flips an atomic flag. The host loop polls
//! [`ShutdownSignal::requested`] at points where stopping is safe and exits on its own
//! terms. Nothing in this module ever exits the process.
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use signal_hook::{
    consts::signal::{SIGINT, SIGTERM},
    flag,
};
use tracing::{info, warn};

use crate::error::ShutdownError;

/// Signals that request a graceful shutdown.
pub const SHUTDOWN_SIGNALS: [i32; 2] = [SIGINT, SIGTERM];

/// Observable states of a [`ShutdownSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// No termination request has been received.
    Running,
    /// A termination request arrived; the host should wind down.
    ShutdownRequested,
}

/// Cooperative shutdown flag fed by OS signals.
#[derive(Debug)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    reported: AtomicBool,
}

impl ShutdownSignal {
    /// Registers handlers for SIGINT and SIGTERM.
    ///
    /// The handlers stay registered for the rest of the process lifetime. Dropping the
    /// signal does not restore the default disposition.
    pub fn install() -> Result<Self, ShutdownError> {
        let signal = Self::detached();
        for sig in SHUTDOWN_SIGNALS {
            flag::register(sig, Arc::clone(&signal.requested))
                .map_err(|source| ShutdownError::Install { source })?;
        }

        info!("Installed graceful shutdown handlers for SIGINT and SIGTERM");
        Ok(signal)
    }

    /// A shutdown flag that is not connected to any OS signal.
    ///
    /// Useful when shutdown is triggered programmatically through
    /// [`request`](Self::request).
    pub fn detached() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            reported: AtomicBool::new(false),
        }
    }

    /// Returns `true` once a termination request has been received.
    ///
    /// The first poll that observes the request logs a warning; later polls stay quiet.
    pub fn requested(&self) -> bool {
        let requested = self.requested.load(Ordering::SeqCst);
        if requested && !self.reported.swap(true, Ordering::SeqCst) {
            warn!("Shutdown requested; finishing current work before exiting");
        }
        requested
    }

    /// Current state of the state machine.
    pub fn state(&self) -> ShutdownState {
        if self.requested() {
            ShutdownState::ShutdownRequested
        } else {
            ShutdownState::Running
        }
    }

    /// Requests shutdown without a signal. Repeated calls have no further effect.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// A cloneable view of the flag for worker threads.
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            requested: Arc::clone(&self.requested),
        }
    }
}

/// Cheap, cloneable view of a [`ShutdownSignal`] flag.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Returns `true` once a termination request has been received.
    pub fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Requests shutdown from any thread.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }
}
