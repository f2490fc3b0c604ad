//! Single-instance detection over the local process table.
//!
//! The guard is advisory. Two processes that start within the same scheduling window
//! can both finish their scan before either shows up in the other's snapshot, so both
//! proceed. Hosts that need real mutual exclusion should additionally take a lock with
//! [`LockFile::acquire_exclusive`](crate::lock::LockFile::acquire_exclusive).
use std::collections::{HashMap, HashSet};

use sysinfo::{Process, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::{debug, error, warn};

use crate::constants::EXIT_FAILURE;
use crate::error::InstanceError;

/// One row of a process table snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// Process id.
    pub pid: u32,
    /// Parent process id, when known.
    pub parent: Option<u32>,
    /// Full command line joined with spaces, or the executable name when the
    /// command line is not readable.
    pub command: String,
}

/// Source of process table snapshots.
pub trait ProcessTable {
    /// Returns every process currently visible to the caller.
    fn snapshot(&self) -> Result<Vec<ProcessEntry>, InstanceError>;
}

/// The live table of the local host, read through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn snapshot(&self) -> Result<Vec<ProcessEntry>, InstanceError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(InstanceError::ProcessScan(
                "process enumeration is not supported on this platform".into(),
            ));
        }

        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
        );

        // Threads show up as their own entries on Linux; only whole processes count.
        let entries: Vec<ProcessEntry> = system
            .processes()
            .iter()
            .filter(|(_, process)| process.thread_kind().is_none())
            .map(|(pid, process)| ProcessEntry {
                pid: pid.as_u32(),
                parent: process.parent().map(|parent| parent.as_u32()),
                command: command_line(process),
            })
            .collect();

        // A readable table always contains at least the caller.
        if entries.is_empty() {
            return Err(InstanceError::ProcessScan("process table is empty".into()));
        }

        Ok(entries)
    }
}

fn command_line(process: &Process) -> String {
    let args: Vec<String> = process
        .cmd()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    if args.is_empty() {
        process.name().to_string_lossy().into_owned()
    } else {
        args.join(" ")
    }
}

/// Decides whether another process carrying the same name tag is already running.
#[derive(Debug, Clone)]
pub struct InstanceGuard {
    name_tag: String,
    own_pid: u32,
}

impl InstanceGuard {
    /// Builds a guard for `name_tag` on behalf of the calling process.
    pub fn new(name_tag: impl Into<String>) -> Self {
        Self {
            name_tag: name_tag.into(),
            own_pid: std::process::id(),
        }
    }

    /// Overrides the pid treated as "self".
    pub fn with_own_pid(mut self, pid: u32) -> Self {
        self.own_pid = pid;
        self
    }

    /// The tag matched against command lines.
    pub fn name_tag(&self) -> &str {
        &self.name_tag
    }

    /// Returns the sorted pids of competing processes.
    ///
    /// A process competes when its command line contains the tag and it is neither
    /// the caller nor one of the caller's ancestors. Ancestors are skipped because a
    /// launcher such as `sh -c "... tag"` carries the tag without being a second
    /// instance. A tagged ancestor is therefore never counted as a duplicate, even
    /// when it is a genuine earlier instance that spawned the caller. An empty tag
    /// matches nothing.
    pub fn find_duplicates<T>(&self, table: &T) -> Result<Vec<u32>, InstanceError>
    where
        T: ProcessTable + ?Sized,
    {
        if self.name_tag.is_empty() {
            return Ok(Vec::new());
        }

        let entries = table.snapshot()?;
        let ancestors = ancestors_of(self.own_pid, &entries);

        let mut pids: Vec<u32> = entries
            .iter()
            .filter(|entry| entry.pid != self.own_pid)
            .filter(|entry| !ancestors.contains(&entry.pid))
            .filter(|entry| entry.command.contains(&self.name_tag))
            .map(|entry| entry.pid)
            .collect();
        pids.sort_unstable();
        pids.dedup();

        Ok(pids)
    }

    /// Returns `true` when it is safe to proceed.
    ///
    /// An unreadable process table fails open: the failure is logged and the caller
    /// is allowed to run, trading strict enforcement for availability.
    pub fn check<T>(&self, table: &T) -> bool
    where
        T: ProcessTable + ?Sized,
    {
        match self.find_duplicates(table) {
            Ok(duplicates) if duplicates.is_empty() => {
                debug!("No other instance of '{}' found", self.name_tag);
                true
            }
            Ok(duplicates) => {
                warn!(
                    "Another instance of '{}' is already running (pid {})",
                    self.name_tag,
                    join_pids(&duplicates)
                );
                false
            }
            Err(err) => {
                warn!(
                    "{err}; assuming no other instance of '{}' is running",
                    self.name_tag
                );
                true
            }
        }
    }

    /// Like [`check`](Self::check), but exits the process with status 1 when a
    /// duplicate is found.
    pub fn enforce<T>(&self, table: &T)
    where
        T: ProcessTable + ?Sized,
    {
        if !self.check(table) {
            error!(
                "Refusing to start a second instance of '{}'",
                self.name_tag
            );
            std::process::exit(EXIT_FAILURE);
        }
    }
}

/// Returns `true` when no other live process carries `name_tag`.
pub fn check_single_instance(name_tag: &str) -> bool {
    InstanceGuard::new(name_tag).check(&SystemProcessTable)
}

/// Exits the process with status 1 when another live process carries `name_tag`.
pub fn enforce_single_instance(name_tag: &str) {
    InstanceGuard::new(name_tag).enforce(&SystemProcessTable);
}

fn ancestors_of(pid: u32, entries: &[ProcessEntry]) -> HashSet<u32> {
    let parents: HashMap<u32, u32> = entries
        .iter()
        .filter_map(|entry| entry.parent.map(|parent| (entry.pid, parent)))
        .collect();

    let mut ancestors = HashSet::new();
    let mut current = pid;
    while let Some(&parent) = parents.get(&current) {
        if parent == pid || !ancestors.insert(parent) {
            break;
        }
        current = parent;
    }

    ancestors
}

fn join_pids(pids: &[u32]) -> String {
    pids.iter()
        .map(|pid| pid.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
