//! # Runtime configuration.
//!
//! [`RuntimeConfig`] holds the knobs of the execution contexts themselves; the
//! rate-selection rules live in [`ControllerConfig`](crate::ControllerConfig).

use std::time::Duration;

/// Settings for [`Runtime::start`](crate::Runtime::start).
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Maximum time [`Runtime::shutdown`](crate::Runtime::shutdown) waits for
    /// the scheduler task and the executor thread to stop.
    pub grace: Duration,

    /// Name of the executor's OS thread (visible in `ps -T`, `top -H`).
    pub worker_name: String,
}

impl Default for RuntimeConfig {
    /// - `grace = 5s`
    /// - `worker_name = "HeavyWorker"`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(5),
            worker_name: "HeavyWorker".to_string(),
        }
    }
}
