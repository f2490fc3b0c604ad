//! Leveled, flag-gated console output.
//!
//! A [`LogSink`] is built once from an immutable [`LogConfiguration`]. Each level is
//! enabled or disabled at construction; toggling a command-line flag afterwards has
//! no effect on a sink that already exists. The sink also acts as a `tracing` layer
//! so library code logs with the usual `tracing` macros and the host decides, through
//! the configuration, what reaches the console.
use std::{
    fmt::{self, Write as _},
    io::{self, Write},
};

use serde::Deserialize;
use strum_macros::{AsRefStr, EnumString};
use tracing::{
    Event, Metadata, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
    prelude::*,
    util::TryInitError,
};

use crate::constants::{ANSI_CYAN, ANSI_RED, ANSI_RESET, ANSI_YELLOW};

/// Console output levels. `Info` and `Verbose` share one emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Level {
    /// Informational output, gated like `Verbose`.
    Info,
    /// Chatty progress output, only shown with `--verbose`.
    Verbose,
    /// Developer diagnostics, only shown with `--debug`.
    Debug,
    /// Warnings, shown unless `--no-warn`.
    Warn,
    /// Errors, shown unless `--no-error`.
    Error,
}

impl Level {
    /// Textual label written in front of every message of this level.
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::Info | Self::Verbose => "VERBOSE: ",
            Self::Debug => "DEBUG: ",
            Self::Warn => "WARN: ",
            Self::Error => "ERROR: ",
        }
    }

    /// Escape sequence used when color output is enabled.
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Info | Self::Verbose => ANSI_RESET,
            Self::Debug => ANSI_CYAN,
            Self::Warn => ANSI_YELLOW,
            Self::Error => ANSI_RED,
        }
    }

    /// Maps a `tracing` level onto the console level that renders it.
    pub fn from_tracing(level: &tracing::Level) -> Self {
        if *level == tracing::Level::ERROR {
            Self::Error
        } else if *level == tracing::Level::WARN {
            Self::Warn
        } else if *level == tracing::Level::INFO {
            Self::Verbose
        } else {
            Self::Debug
        }
    }
}

/// Snapshot of the output switches, taken once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfiguration {
    /// Disables every level, overriding all other switches.
    pub quiet: bool,
    /// Wraps lines in ANSI color codes.
    pub color: bool,
    /// Enables info/verbose output.
    pub verbose: bool,
    /// Enables debug output.
    pub debug: bool,
    /// Enables warnings.
    pub warn: bool,
    /// Enables errors.
    pub error: bool,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        Self {
            quiet: false,
            color: true,
            verbose: false,
            debug: false,
            warn: true,
            error: true,
        }
    }
}

impl LogConfiguration {
    /// Returns whether messages of `level` are written under this configuration.
    pub const fn is_enabled(&self, level: Level) -> bool {
        if self.quiet {
            return false;
        }

        match level {
            Level::Info | Level::Verbose => self.verbose,
            Level::Debug => self.debug,
            Level::Warn => self.warn,
            Level::Error => self.error,
        }
    }
}

/// Console emitter bound to a fixed [`LogConfiguration`].
///
/// Output goes to stdout unless another writer is supplied. Writing is best
/// effort: a failed write drops that message and never panics.
#[derive(Debug, Clone)]
pub struct LogSink<W = fn() -> io::Stdout> {
    config: LogConfiguration,
    make_writer: W,
}

impl LogSink {
    /// Builds a sink that writes to standard output.
    pub fn new(config: LogConfiguration) -> Self {
        Self {
            config,
            make_writer: io::stdout,
        }
    }
}

impl<W> LogSink<W>
where
    W: for<'a> MakeWriter<'a>,
{
    /// Builds a sink that writes through `make_writer`.
    pub fn with_writer(config: LogConfiguration, make_writer: W) -> Self {
        Self {
            config,
            make_writer,
        }
    }

    /// The configuration this sink was built with.
    pub fn config(&self) -> LogConfiguration {
        self.config
    }

    /// Returns whether `level` produces output on this sink.
    pub fn is_enabled(&self, level: Level) -> bool {
        self.config.is_enabled(level)
    }

    /// Renders a line exactly as [`emit`](Self::emit) would write it.
    pub fn format(&self, level: Level, message: &str) -> String {
        if self.config.color {
            format!(
                "{}{}{}{}\n",
                level.color(),
                level.prefix(),
                message,
                ANSI_RESET
            )
        } else {
            format!("{}{}\n", level.prefix(), message)
        }
    }

    /// Writes `message` at `level` if that level is enabled.
    pub fn emit(&self, level: Level, message: &str) {
        if !self.is_enabled(level) {
            return;
        }

        let line = self.format(level, message);
        let mut writer = self.make_writer.make_writer();
        let _ = writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush());
    }

    /// Writes an informational line (shares the verbose switch).
    pub fn info(&self, message: &str) {
        self.emit(Level::Info, message);
    }

    /// Writes a verbose line.
    pub fn verbose(&self, message: &str) {
        self.emit(Level::Verbose, message);
    }

    /// Writes a debug line.
    pub fn debug(&self, message: &str) {
        self.emit(Level::Debug, message);
    }

    /// Writes a warning line.
    pub fn warn(&self, message: &str) {
        self.emit(Level::Warn, message);
    }

    /// Writes an error line.
    pub fn error(&self, message: &str) {
        self.emit(Level::Error, message);
    }
}

impl<W> LogSink<W>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    /// Installs this sink as the global `tracing` subscriber.
    ///
    /// Fails if a global subscriber is already set.
    pub fn init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry().with(self).try_init()
    }
}

impl<S, W> Layer<S> for LogSink<W>
where
    S: Subscriber,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.is_enabled(Level::from_tracing(metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = Level::from_tracing(event.metadata().level());
        if !self.is_enabled(level) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.emit(level, &visitor.finish());
    }
}

/// Flattens a `tracing` event into `message key=value ...`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
