//! # Runtime: owns the bus and the two worker contexts.
//!
//! [`Runtime`] replaces process-wide singletons with one explicit context that
//! is built once and handed to the controller and to producers.
//!
//! ## Execution contexts
//! ```text
//!   producer thread(s)          scheduler task              executor thread
//!   ──────────────────          ──────────────              ───────────────
//!   Bus::publish(&Signal)       one debounce closure        one heavy closure
//!     └─► subscriber callbacks    at a time                   at a time
//!           ├─► Scheduler::set_work ──────►┘                       ▲
//!           └─► Executor::set_work ────────────────────────────────┘
//! ```
//!
//! ## Shutdown path
//! ```text
//! shutdown()
//!   ├─► token.cancel()          → scheduler loop exits
//!   ├─► scheduler.join()
//!   ├─► executor.shutdown()     → queued work drained, thread joined
//!   │     (from a detached joiner thread, awaited over a oneshot)
//!   └─► all within cfg.grace, else RuntimeError::GraceExceeded
//! ```

use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{config::RuntimeConfig, executor::Executor, scheduler::Scheduler, shutdown};
use crate::error::RuntimeError;
use crate::events::Bus;

/// Explicit context holding the bus, scheduler and executor.
pub struct Runtime {
    cfg: RuntimeConfig,
    bus: Arc<Bus>,
    scheduler: Arc<Scheduler>,
    executor: Arc<Executor>,
    token: CancellationToken,
}

impl Runtime {
    /// Builds all components. Must be called from within a tokio runtime.
    pub fn start(cfg: RuntimeConfig) -> Result<Self, RuntimeError> {
        let token = CancellationToken::new();
        let executor = Executor::spawn(&cfg.worker_name)?;
        let scheduler = Scheduler::spawn(token.child_token());
        info!(worker = %cfg.worker_name, "runtime started");

        Ok(Self {
            cfg,
            bus: Arc::new(Bus::new()),
            scheduler,
            executor,
            token,
        })
    }

    /// Event bus.
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Debounce scheduler.
    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Heavy-work executor.
    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// Token cancelled when the runtime shuts down.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Waits for an OS termination signal or an explicit cancel, then shuts down.
    pub async fn run_until_signal(self) -> Result<(), RuntimeError> {
        tokio::select! {
            res = shutdown::wait_for_shutdown_signal() => { res?; }
            _ = self.token.cancelled() => {}
        }
        self.shutdown().await
    }

    /// Stops the scheduler task and the executor thread within `cfg.grace`.
    pub async fn shutdown(self) -> Result<(), RuntimeError> {
        self.token.cancel();
        let grace = self.cfg.grace;

        let scheduler = Arc::clone(&self.scheduler);
        let sched_done = tokio::time::timeout(grace, async move { scheduler.join().await }).await;

        // A hung closure must not pin the tokio runtime, so join from a detached thread.
        let (done_tx, done_rx) = oneshot::channel();
        let executor = Arc::clone(&self.executor);
        let joiner = thread::Builder::new()
            .name(format!("{}-join", executor.name()))
            .spawn(move || {
                executor.shutdown();
                let _ = done_tx.send(());
            })
            .map_err(|source| RuntimeError::WorkerSpawn {
                name: format!("{}-join", self.cfg.worker_name),
                source,
            })?;
        drop(joiner);
        let exec_done = tokio::time::timeout(grace, done_rx).await;

        let mut stuck = Vec::new();
        if sched_done.is_err() {
            stuck.push("scheduler");
        }
        if !matches!(exec_done, Ok(Ok(()))) {
            stuck.push("executor");
        }

        if stuck.is_empty() {
            info!("runtime stopped");
            Ok(())
        } else {
            warn!(?stuck, ?grace, "runtime did not stop within grace");
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}
