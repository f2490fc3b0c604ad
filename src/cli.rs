//! Command-line interface for procguard.
//!
//! [`LogArgs`] is the reusable part: any host program can flatten it into its own
//! clap parser to get the standard output switches. [`Cli`] is the `procguard`
//! binary's own interface.
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::logging::LogConfiguration;

/// Standard output switches shared by every host program.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Disable all output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Show verbose output.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Show debug output.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable warnings.
    #[arg(long = "no-warn", global = true)]
    pub no_warn: bool,

    /// Disable errors.
    #[arg(long = "no-error", global = true)]
    pub no_error: bool,
}

impl LogArgs {
    /// Applies these switches on top of `base`.
    ///
    /// Switches can only turn output off (or turn verbose/debug on); a switch
    /// that was not given leaves `base` untouched.
    pub fn apply_to(&self, base: LogConfiguration) -> LogConfiguration {
        LogConfiguration {
            quiet: base.quiet || self.quiet,
            color: base.color && !self.no_color,
            verbose: base.verbose || self.verbose,
            debug: base.debug || self.debug,
            warn: base.warn && !self.no_warn,
            error: base.error && !self.no_error,
        }
    }
}

impl From<LogArgs> for LogConfiguration {
    fn from(args: LogArgs) -> Self {
        args.apply_to(LogConfiguration::default())
    }
}

/// Command-line interface for procguard.
#[derive(Parser, Debug)]
#[command(name = "procguard", version, author, disable_version_flag = true)]
#[command(
    about = "Single-instance checks, advisory lock files and graceful shutdown for scripts",
    long_about = None
)]
pub struct Cli {
    /// Output switches.
    #[command(flatten)]
    pub log: LogArgs,

    /// Refuse to run unless the effective user is root.
    #[arg(long = "require-root", global = true)]
    pub require_root: bool,

    /// Report lock changes without making them.
    #[arg(long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Print version.
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: Option<bool>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for procguard.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exit with status 1 if another process carrying TAG is running.
    Check {
        /// Name tag matched against process command lines.
        tag: String,
    },

    /// Manage advisory lock markers.
    Lock {
        /// The lock operation.
        #[command(subcommand)]
        action: LockAction,
    },

    /// Run a host loop until SIGINT or SIGTERM arrives.
    Watch {
        /// Path to a YAML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Name tag for the single-instance check.
        #[arg(short, long)]
        name: Option<String>,

        /// Target path to guard with an advisory lock while running.
        #[arg(short, long)]
        lock: Option<PathBuf>,

        /// Owner id written into the lock marker (defaults to the pid).
        #[arg(long)]
        owner: Option<String>,

        /// Interval between shutdown polls (e.g. `250ms`, `1s`).
        #[arg(short, long)]
        interval: Option<String>,

        /// Stop on its own after this many polls.
        #[arg(long = "max-ticks")]
        max_ticks: Option<u64>,
    },
}

/// Lock subcommands.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Claim the lock guarding PATH.
    Acquire {
        /// Target path; the marker is PATH.lock.
        path: PathBuf,

        /// Owner id to record (defaults to the pid of this invocation).
        #[arg(long)]
        owner: Option<String>,

        /// Use an atomic create that cannot race with another acquirer.
        #[arg(long)]
        exclusive: bool,
    },

    /// Remove the lock guarding PATH.
    Release {
        /// Target path; the marker is PATH.lock.
        path: PathBuf,
    },

    /// Print whether PATH is locked and by whom.
    ///
    /// The answer goes to stdout as the command's result rather than through the
    /// log sink, so `--quiet` does not suppress it.
    Status {
        /// Target path; the marker is PATH.lock.
        path: PathBuf,
    },
}

/// Parses command-line arguments into a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
