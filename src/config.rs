//! Host configuration loaded from YAML.
//!
//! Everything here is optional: a host can build a [`LogConfiguration`] straight from
//! its command-line flags and never touch a file. When a file is used it looks like:
//!
//! ```yaml
//! log:
//!   verbose: true
//!   color: false
//! instance: "nightly-backup"
//! lock: "${HOME}/backups/archive"
//! poll_interval: "250ms"
//! ```
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use regex::{Captures, Regex};
use serde::Deserialize;

use crate::constants::DEFAULT_POLL_INTERVAL;
use crate::error::ConfigError;
use crate::logging::LogConfiguration;

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("env var pattern is valid")
});

/// Settings for a host program built on the lifecycle primitives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Console output switches.
    pub log: LogConfiguration,
    /// Name tag used for the single-instance check.
    pub instance: Option<String>,
    /// Target path guarded by an advisory lock.
    pub lock: Option<PathBuf>,
    /// Owner id written into the lock marker.
    pub owner: Option<String>,
    /// Interval between shutdown polls (e.g. `500ms`, `2s`).
    pub poll_interval: Option<String>,
}

impl HostConfig {
    /// Parsed poll interval, falling back to the default.
    pub fn poll_interval(&self) -> Result<Duration, ConfigError> {
        match self.poll_interval.as_deref() {
            Some(raw) => parse_duration(raw),
            None => Ok(DEFAULT_POLL_INTERVAL),
        }
    }
}

/// Loads the configuration at `path`, expanding `$VAR` and `${VAR}` references.
///
/// A relative `lock` path is resolved against the directory holding the file.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::Read(std::io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })?;

    let expanded = expand_env_vars(&content)?;
    let mut config: HostConfig = serde_yaml::from_str(&expanded)?;

    let base_path = path.parent().unwrap_or_else(|| Path::new("."));
    if let Some(lock) = config.lock.as_mut()
        && lock.is_relative()
    {
        *lock = base_path.join(&*lock);
    }

    Ok(config)
}

/// Substitutes environment variables, failing on the first one that is unset.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing: Option<String> = None;
    let expanded = ENV_VAR.replace_all(input, |caps: &Captures| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        match env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::MissingVariable(name)),
        None => Ok(expanded.into_owned()),
    }
}

/// Parses `250ms`, `10s`, `5m`, `2h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ConfigError::InvalidDuration(raw.to_string()));
    }

    let invalid = || ConfigError::InvalidDuration(raw.to_string());

    if let Some(stripped) = value.strip_suffix("ms") {
        let amount: u64 = stripped.trim().parse().map_err(|_| invalid())?;
        return Ok(Duration::from_millis(amount));
    }

    let (amount_str, multiplier) = if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3600)
    } else {
        (value, 1)
    };

    let amount: u64 = amount_str.parse().map_err(|_| invalid())?;
    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}
