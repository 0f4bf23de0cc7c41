//! # Debounce scheduler: many logical timers on one timer.
//!
//! [`Scheduler`] owns a table of slots `(deadline, work)`. A single tokio task
//! (the delivery context) sleeps until the earliest armed deadline, fires
//! **one** due slot, and re-arms.
//!
//! ## Architecture
//! ```text
//! set_work(h, work, at) ──► [slot table] ──► notify ─┐
//!                              (Mutex)               ▼
//!                                        ┌─────── run loop ───────┐
//!                                        │ next = min(deadline)   │
//!                                        │ select! {              │
//!                                        │   cancelled → exit     │
//!                                        │   notified  → re-arm   │
//!                                        │   sleep(next) → fire   │
//!                                        │ }                      │
//!                                        └────────────────────────┘
//! fire: lock → pick earliest due (ties: lowest handle) → clear slot → unlock
//!       → work() outside the lock → loop re-arms
//! ```
//!
//! ## Rules
//! - **Last write wins**: `set_work` replaces the slot's pending closure.
//! - **Cancel** = `set_work(h, None, _)`; the slot goes back to sleeping.
//! - **One fire per wake-up**; further due slots fire on the next wake-up,
//!   which is armed [`MIN_INTERVAL`] ahead (never zero, no busy loop).
//! - **Reentrant**: closures run outside the lock and may call `set_work`.
//! - **Unknown handle** panics ([`HandleError`]).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::error::HandleError;

/// Deferred closure run by the scheduler or the executor.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Delay used when the earliest deadline has already passed.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Identifies a scheduler slot. Dense, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(usize);

impl TimerHandle {
    /// Slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

struct Slot {
    name: String,
    deadline: Option<Instant>,
    work: Option<Work>,
}

/// Multiplexes debounce timers onto a single delivery task.
pub struct Scheduler {
    slots: Mutex<Vec<Slot>>,
    rearm: Notify,
    token: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Creates the scheduler and spawns its delivery task.
    ///
    /// Must be called from within a tokio runtime. The task exits when `token`
    /// is cancelled.
    pub fn spawn(token: CancellationToken) -> Arc<Self> {
        let me = Arc::new(Self {
            slots: Mutex::new(Vec::new()),
            rearm: Notify::new(),
            token,
            join: Mutex::new(None),
        });
        let handle = tokio::spawn(Arc::clone(&me).run());
        *me.join.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        me
    }

    /// Creates a fresh sleeping slot.
    pub fn create(&self, name: &str) -> TimerHandle {
        let mut slots = self.lock();
        slots.push(Slot {
            name: name.to_string(),
            deadline: None,
            work: None,
        });
        TimerHandle(slots.len() - 1)
    }

    /// Replaces the slot's pending work and deadline; `None` cancels.
    ///
    /// # Panics
    /// Panics if `handle` was not issued by this scheduler.
    pub fn set_work(&self, handle: TimerHandle, work: Option<Work>, deadline: Instant) {
        if let Err(e) = self.try_set_work(handle, work, deadline) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`Scheduler::set_work`].
    pub fn try_set_work(
        &self,
        handle: TimerHandle,
        work: Option<Work>,
        deadline: Instant,
    ) -> Result<(), HandleError> {
        {
            let mut slots = self.lock();
            let len = slots.len();
            let slot = slots.get_mut(handle.0).ok_or(HandleError::Scheduler {
                handle: handle.0,
                slots: len,
            })?;
            slot.deadline = work.as_ref().map(|_| deadline);
            slot.work = work;
        }
        self.rearm.notify_one();
        Ok(())
    }

    /// Arms `handle` to run `work` after `delay`.
    pub fn schedule<F>(&self, handle: TimerHandle, delay: Duration, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.set_work(handle, Some(Box::new(work)), Instant::now() + delay);
    }

    /// Drops any pending work of `handle`.
    pub fn cancel(&self, handle: TimerHandle) {
        self.set_work(handle, None, Instant::now());
    }

    /// Returns true if `handle` has pending work.
    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.lock()
            .get(handle.0)
            .is_some_and(|slot| slot.deadline.is_some())
    }

    /// Waits for the delivery task to exit (after the token was cancelled).
    pub async fn join(&self) {
        let handle = self.join.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn run(self: Arc<Self>) {
        loop {
            let next = self.next_wakeup();
            let sleep = async {
                match next {
                    Some(at) => time::sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = self.rearm.notified() => continue,
                _ = sleep => self.fire_one(),
            }
        }
    }

    /// Earliest armed deadline, clamped to at least [`MIN_INTERVAL`] from now.
    fn next_wakeup(&self) -> Option<Instant> {
        let earliest = self.lock().iter().filter_map(|s| s.deadline).min()?;
        let now = Instant::now();
        Some(if earliest > now {
            earliest
        } else {
            now + MIN_INTERVAL
        })
    }

    fn fire_one(&self) {
        let picked = {
            let mut slots = self.lock();
            let now = Instant::now();
            let mut best: Option<(usize, Instant)> = None;
            for (idx, slot) in slots.iter().enumerate() {
                if let Some(at) = slot.deadline {
                    if at <= now && best.is_none_or(|(_, b)| at < b) {
                        best = Some((idx, at));
                    }
                }
            }
            best.map(|(idx, _)| {
                let slot = &mut slots[idx];
                slot.deadline = None;
                (slot.name.clone(), slot.work.take())
            })
        };

        // set_work() may be called from inside work()
        if let Some((name, Some(work))) = picked {
            trace!(slot = %name, "debounce fired");
            if catch_unwind(AssertUnwindSafe(work)).is_err() {
                error!(slot = %name, "debounce work panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
