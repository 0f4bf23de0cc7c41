//! # OS termination signals.
//!
//! [`wait_for_shutdown_signal`] completes when the process is asked to stop.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`, plus `SIGUSR1` which a respawning
//! parent sends to retire the previous instance.
//! **Other platforms:** Ctrl-C only.

use tracing::info;

use crate::error::RuntimeError;

/// Waits for a termination signal and returns its name.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).map_err(RuntimeError::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(RuntimeError::Signal)?;
    let mut sigquit = signal(SignalKind::quit()).map_err(RuntimeError::Signal)?;
    let mut sigusr1 = signal(SignalKind::user_defined1()).map_err(RuntimeError::Signal)?;

    let name = tokio::select! {
        _ = sigint.recv()  => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigquit.recv() => "SIGQUIT",
        _ = sigusr1.recv() => "SIGUSR1",
    };
    info!(signal = name, "shutdown requested");
    Ok(name)
}

/// Waits for a termination signal and returns its name.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, RuntimeError> {
    tokio::signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
    info!(signal = "ctrl-c", "shutdown requested");
    Ok("ctrl-c")
}
