//! Error types used by the dfps runtime and controller.
//!
//! - [`ConfigError`] — fatal configuration problems; the controller cannot be built.
//! - [`SyntaxError`] — a single malformed config line; logged and skipped by the loader.
//! - [`HandleError`] — an unknown scheduler/executor handle (programmer error).
//! - [`RuntimeError`] — failures of the runtime itself (worker spawn, shutdown grace).
//! - [`SignalParseError`] — a textual signal line could not be decoded.
//!
//! All types provide `as_label` for stable snake_case identifiers in logs.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::controller::SwitchMode;

/// # Fatal configuration errors.
///
/// Returned by [`ControllerConfig::parse`](crate::ControllerConfig::parse) and
/// [`ControllerConfig::load`](crate::ControllerConfig::load) when the rule table
/// cannot be used at all.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot open config '{}': {source}", path.display())]
    Io {
        /// Path that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// One of the mandatory rules (`*` or `-`) is absent.
    #[error("{} rule '{rule}' not specified in the config file", describe_rule(rule))]
    MissingRule {
        /// Key of the missing rule.
        rule: &'static str,
    },

    /// A rule's hz pair does not match the switching mode.
    #[error("rule of '{rule}' ({idle}/{active}) is invalid for {mode} switching")]
    InvalidRule {
        /// Package name (or sentinel key) of the offending rule.
        rule: String,
        /// Configured idle value.
        idle: i32,
        /// Configured active value.
        active: i32,
        /// Switching mode the rule was checked against.
        mode: SwitchMode,
    },
}

fn describe_rule(rule: &str) -> &'static str {
    match rule {
        crate::controller::UNIVERSAL_RULE => "default",
        crate::controller::OFFSCREEN_RULE => "offscreen",
        _ => "mandatory",
    }
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Io { .. } => "config_io",
            ConfigError::MissingRule { .. } => "config_missing_rule",
            ConfigError::InvalidRule { .. } => "config_invalid_rule",
        }
    }
}

/// A malformed config line. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// Tunable line without `/<name> <value>`.
    #[error("broken tunable line")]
    BrokenTunable,

    /// Tunable value is not an integer.
    #[error("tunable '{name}' has non-integer value '{value}'")]
    TunableValue {
        /// Tunable name.
        name: String,
        /// Raw value.
        value: String,
    },

    /// Rule line without `<package> <idle> <active>`.
    #[error("broken rule line")]
    BrokenRule,
}

impl SyntaxError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SyntaxError::BrokenTunable => "syntax_broken_tunable",
            SyntaxError::TunableValue { .. } => "syntax_tunable_value",
            SyntaxError::BrokenRule => "syntax_broken_rule",
        }
    }
}

/// # Unknown worker handle.
///
/// Handles are dense indices issued by `create`; an out-of-range value can only
/// come from a different scheduler/executor instance.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Scheduler handle not found.
    #[error("scheduler handle not found, handle = {handle}, slots = {slots}")]
    Scheduler {
        /// Offending handle index.
        handle: usize,
        /// Number of slots created so far.
        slots: usize,
    },

    /// Executor handle not found.
    #[error("executor handle not found, handle = {handle}, slots = {slots}")]
    Executor {
        /// Offending handle index.
        handle: usize,
        /// Number of slots created so far.
        slots: usize,
    },
}

impl HandleError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandleError::Scheduler { .. } => "scheduler_handle_not_found",
            HandleError::Executor { .. } => "executor_handle_not_found",
        }
    }
}

/// # Errors produced by the runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The executor thread could not be started.
    #[error("failed to spawn worker thread '{name}': {source}")]
    WorkerSpawn {
        /// Thread name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Shutdown did not finish within the grace period.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Components that did not stop in time.
        stuck: Vec<&'static str>,
    },

    /// Waiting for OS termination signals failed.
    #[error("cannot listen for shutdown signals: {0}")]
    Signal(#[source] io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use dfps::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::WorkerSpawn { .. } => "runtime_worker_spawn",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// A textual signal line could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignalParseError {
    /// Empty line.
    #[error("empty signal line")]
    Empty,

    /// Topic key not recognised.
    #[error("unknown topic '{0}'")]
    UnknownTopic(String),

    /// Payload does not fit the topic's contract.
    #[error("invalid payload for '{topic}': '{payload}'")]
    Payload {
        /// Topic key.
        topic: String,
        /// Raw payload text.
        payload: String,
    },
}

impl SignalParseError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SignalParseError::Empty => "signal_empty",
            SignalParseError::UnknownTopic(_) => "signal_unknown_topic",
            SignalParseError::Payload { .. } => "signal_payload",
        }
    }
}
