use std::{
    error::Error,
    path::{Path, PathBuf},
    process, thread,
    time::Duration,
};
use tracing::{debug, error, info, warn};

use procguard::{
    cli::{Cli, Commands, LockAction, parse_args},
    config::{HostConfig, load_config, parse_duration},
    constants::{DEFAULT_CONFIG_FILE, EXIT_FAILURE},
    error::ConfigError,
    instance::{InstanceGuard, SystemProcessTable},
    lock::{LockFile, LockGuard},
    logging::{LogConfiguration, LogSink},
    preflight,
    shutdown::ShutdownSignal,
};

fn main() {
    let args = parse_args();

    let host_config = load_host_config(&args);
    let file_log = host_config
        .as_ref()
        .ok()
        .and_then(|config| config.as_ref())
        .map(|config| config.log)
        .unwrap_or_default();
    init_logging(args.log.apply_to(file_log));

    let host_config = match host_config {
        Ok(config) => config.unwrap_or_default(),
        Err(err) => {
            error!("{err}");
            process::exit(EXIT_FAILURE);
        }
    };

    if args.require_root && preflight::require_root().is_err() {
        process::exit(EXIT_FAILURE);
    }

    if let Err(err) = run(args.command, host_config, args.dry_run) {
        error!("{err}");
        process::exit(EXIT_FAILURE);
    }
}

fn init_logging(config: LogConfiguration) {
    let _ = LogSink::new(config).init();
}

/// Only `watch` reads a configuration file: the one given with `--config`, or
/// `procguard.yaml` in the working directory when present.
fn load_host_config(args: &Cli) -> Result<Option<HostConfig>, ConfigError> {
    match &args.command {
        Commands::Watch {
            config: Some(path), ..
        } => load_config(path).map(Some),
        Commands::Watch { config: None, .. } if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_FILE)).map(Some)
        }
        _ => Ok(None),
    }
}

fn run(
    command: Commands,
    host_config: HostConfig,
    dry_run: bool,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Check { tag } => {
            InstanceGuard::new(tag.as_str()).enforce(&SystemProcessTable);
            info!("No other instance of '{tag}' is running");
        }
        Commands::Lock { action } => run_lock(action, dry_run),
        Commands::Watch {
            name,
            lock,
            owner,
            interval,
            max_ticks,
            ..
        } => {
            let interval = match interval {
                Some(raw) => parse_duration(&raw)?,
                None => host_config.poll_interval()?,
            };
            let settings = WatchSettings {
                name: name.or(host_config.instance),
                lock: lock.or(host_config.lock),
                owner: owner.or(host_config.owner),
                interval,
                max_ticks,
                dry_run,
            };
            watch(settings)?;
        }
    }

    Ok(())
}

/// Lock failures are logged by the library, so they only need to set the exit status.
/// With `dry_run`, acquire and release report the outcome they would have and leave
/// the marker untouched.
fn run_lock(action: LockAction, dry_run: bool) {
    match action {
        LockAction::Acquire {
            path,
            owner,
            exclusive,
        } => {
            let lock = build_lock(path, owner);
            if dry_run {
                if lock.is_locked() {
                    warn!("Lock {:?} is already held; acquire would fail", lock.path());
                    process::exit(EXIT_FAILURE);
                }
                info!("Would lock {:?} for owner {}", lock.path(), lock.owner_id());
                return;
            }
            let result = if exclusive {
                lock.acquire_exclusive()
            } else {
                lock.acquire()
            };
            if result.is_err() {
                process::exit(EXIT_FAILURE);
            }
            info!("Locked {:?} for owner {}", lock.path(), lock.owner_id());
        }
        LockAction::Release { path } => {
            let lock = LockFile::new(path);
            if dry_run {
                info!("Would release {:?}", lock.path());
                return;
            }
            if lock.release().is_err() {
                process::exit(EXIT_FAILURE);
            }
            info!("Released {:?}", lock.path());
        }
        LockAction::Status { path } => {
            let lock = LockFile::new(path);
            match lock.owner() {
                Ok(Some(owner)) => println!("locked by {owner}"),
                Ok(None) => println!("unlocked"),
                Err(_) if lock.is_locked() => println!("locked"),
                Err(_) => println!("unlocked"),
            }
        }
    }
}

fn build_lock(target: PathBuf, owner: Option<String>) -> LockFile {
    let lock = LockFile::new(target);
    match owner {
        Some(owner) => lock.with_owner(owner),
        None => lock,
    }
}

struct WatchSettings {
    name: Option<String>,
    lock: Option<PathBuf>,
    owner: Option<String>,
    interval: Duration,
    max_ticks: Option<u64>,
    dry_run: bool,
}

/// Reference host loop: single-instance check, shutdown handlers, lock, then poll
/// until a termination request (or the tick budget) ends it.
fn watch(settings: WatchSettings) -> Result<(), Box<dyn Error>> {
    if let Some(tag) = &settings.name {
        InstanceGuard::new(tag.as_str()).enforce(&SystemProcessTable);
    }

    let shutdown = ShutdownSignal::install()?;

    let guard: Option<LockGuard> = match settings.lock {
        Some(target) if settings.dry_run => {
            info!("Would lock {:?} while watching", target);
            None
        }
        Some(target) => match build_lock(target, settings.owner).acquire_guard() {
            Ok(guard) => Some(guard),
            Err(_) => process::exit(EXIT_FAILURE),
        },
        None => None,
    };

    info!(
        "Watching (poll every {:?}); send SIGINT or SIGTERM to stop",
        settings.interval
    );

    let mut ticks: u64 = 0;
    while !shutdown.requested() {
        if settings.max_ticks.is_some_and(|max| ticks >= max) {
            info!("Reached {ticks} ticks; stopping");
            break;
        }

        thread::sleep(settings.interval);
        ticks += 1;
        debug!("tick {ticks}");
    }

    if let Some(guard) = guard {
        guard.release()?;
    }

    info!("Shut down cleanly after {ticks} ticks");
    Ok(())
}
