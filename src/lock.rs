//! Advisory lock markers beside a target path.
//!
//! A resource `P` is claimed by writing `P.lock` with the owner id (the caller's pid
//! unless overridden) as its entire contents. The presence of the marker is the only
//! signal of "locked"; nothing stops a process that does not check it.
//!
//! [`LockFile::acquire`] is check-then-create, so two acquirers racing on a free path
//! can both succeed. [`LockFile::acquire_exclusive`] closes that window with an atomic
//! create. Neither form expires: a marker left behind by a crashed owner stays until
//! someone releases it. Using several `LockFile` values for the same path inside one
//! process is not supported.
use std::{
    fs::{self, File, OpenOptions},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;
use tracing::{debug, error, warn};

use crate::constants::LOCK_SUFFIX;
use crate::error::LockError;

/// Returns the marker path guarding `target`.
pub fn marker_path(target: &Path) -> PathBuf {
    let mut marker = target.as_os_str().to_owned();
    marker.push(LOCK_SUFFIX);
    PathBuf::from(marker)
}

/// An advisory claim on a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFile {
    path: PathBuf,
    owner: String,
}

impl LockFile {
    /// Lock guarding `target`, owned by the calling process.
    pub fn new(target: impl AsRef<Path>) -> Self {
        Self::for_marker(marker_path(target.as_ref()))
    }

    /// Lock whose marker lives exactly at `path`.
    pub fn for_marker(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: std::process::id().to_string(),
        }
    }

    /// Records `owner` instead of the caller's pid.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// The marker path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The owner id this lock writes on acquire.
    pub fn owner_id(&self) -> &str {
        &self.owner
    }

    /// Returns whether the marker exists. Errors while checking count as "not locked".
    pub fn is_locked(&self) -> bool {
        self.path.try_exists().unwrap_or(false)
    }

    /// Reads the owner recorded in the marker, or `None` when unlocked.
    ///
    /// The read happens under a shared file lock so it never observes a
    /// half-written owner.
    pub fn owner(&self) -> Result<Option<String>, LockError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(self.io_error(source)),
        };

        file.lock_shared().map_err(|source| self.io_error(source))?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        let _ = file.unlock();
        read.map_err(|source| self.io_error(source))?;

        Ok(Some(contents))
    }

    /// Claims the lock unless the marker already exists.
    ///
    /// An existing marker is never overwritten; the call logs a warning and returns
    /// [`LockError::AlreadyLocked`].
    pub fn acquire(&self) -> Result<(), LockError> {
        if self.is_locked() {
            return Err(self.already_locked());
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| self.log_io_failure("create", source))?;

        self.write_owner(file, MarkerCleanup::Keep)?;
        debug!("Acquired lock {:?} for owner {}", self.path, self.owner);
        Ok(())
    }

    /// Claims the lock with an atomic create that fails if the marker exists.
    pub fn acquire_exclusive(&self) -> Result<(), LockError> {
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(self.already_locked());
            }
            Err(source) => return Err(self.log_io_failure("create", source)),
        };

        self.write_owner(file, MarkerCleanup::Remove)?;
        debug!(
            "Acquired exclusive lock {:?} for owner {}",
            self.path, self.owner
        );
        Ok(())
    }

    /// Removes the marker. Releasing an unlocked path succeeds without doing anything.
    pub fn release(&self) -> Result<(), LockError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Released lock {:?}", self.path);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.log_io_failure("remove", source)),
        }
    }

    /// Acquires the lock and returns a guard that releases it when dropped.
    pub fn acquire_guard(self) -> Result<LockGuard, LockError> {
        self.acquire()?;
        Ok(LockGuard::new(self))
    }

    /// Exclusive variant of [`acquire_guard`](Self::acquire_guard).
    pub fn acquire_exclusive_guard(self) -> Result<LockGuard, LockError> {
        self.acquire_exclusive()?;
        Ok(LockGuard::new(self))
    }

    /// Replaces the marker contents with the owner id.
    ///
    /// On failure the marker is removed only when `cleanup` says this call created
    /// it. The check-then-create path cannot know that, since a competing acquirer
    /// may have written the file in between.
    fn write_owner(&self, mut file: File, cleanup: MarkerCleanup) -> Result<(), LockError> {
        let written = file
            .lock_exclusive()
            .and_then(|()| file.set_len(0))
            .and_then(|()| file.write_all(self.owner.as_bytes()))
            .and_then(|()| file.flush());
        let _ = file.unlock();

        if let Err(source) = written {
            drop(file);
            if cleanup == MarkerCleanup::Remove {
                let _ = fs::remove_file(&self.path);
            }
            return Err(self.log_io_failure("write", source));
        }

        Ok(())
    }

    fn already_locked(&self) -> LockError {
        let owner = self.owner().ok().flatten();
        warn!(
            "Lock {:?} is already held{}",
            self.path,
            owner
                .as_deref()
                .map(|owner| format!(" by {owner}"))
                .unwrap_or_default()
        );
        LockError::AlreadyLocked {
            path: self.path.clone(),
            owner,
        }
    }

    fn io_error(&self, source: std::io::Error) -> LockError {
        LockError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn log_io_failure(&self, action: &str, source: std::io::Error) -> LockError {
        error!("Failed to {action} lock file {:?}: {source}", self.path);
        self.io_error(source)
    }
}

/// What to do with the marker when writing the owner fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerCleanup {
    Keep,
    Remove,
}

/// Holds an acquired [`LockFile`] and releases it on drop.
#[derive(Debug)]
pub struct LockGuard {
    lock: LockFile,
    released: bool,
}

impl LockGuard {
    fn new(lock: LockFile) -> Self {
        Self {
            lock,
            released: false,
        }
    }

    /// The held lock.
    pub fn lock(&self) -> &LockFile {
        &self.lock
    }

    /// Releases the lock now and reports any failure.
    pub fn release(mut self) -> Result<(), LockError> {
        self.released = true;
        self.lock.release()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(err) = self.lock.release() {
            warn!("Failed to release lock on drop: {err}");
        }
    }
}

/// Claims `target` for the calling process.
pub fn acquire(target: impl AsRef<Path>) -> Result<(), LockError> {
    LockFile::new(target).acquire()
}

/// Claims `target` on behalf of `owner`.
pub fn acquire_as(target: impl AsRef<Path>, owner: &str) -> Result<(), LockError> {
    LockFile::new(target).with_owner(owner).acquire()
}

/// Releases the claim on `target`.
pub fn release(target: impl AsRef<Path>) -> Result<(), LockError> {
    LockFile::new(target).release()
}

/// Returns whether `target` is currently claimed.
pub fn is_locked(target: impl AsRef<Path>) -> bool {
    LockFile::new(target).is_locked()
}
