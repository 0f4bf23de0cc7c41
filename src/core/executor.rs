//! # Background executor for slow, syscall-bound work.
//!
//! [`Executor`] owns one dedicated OS thread and a table of named slots. Each
//! slot holds at most one pending closure; the worker drains slots in ascending
//! handle order and runs each closure outside the table lock.
//!
//! ## Architecture
//! ```text
//! set_work(h, work) ──► [slot table] ──► wake ──► worker thread
//!                         (Mutex)                   │
//!                                                   ├─► take slot 0 → run
//!                                                   ├─► take slot 1 → run
//!                                                   └─► ... → wait again
//! ```
//!
//! ## Rules
//! - **Serialized**: closures never overlap, whichever slot they came from.
//! - **Last write wins**: a queued (not yet started) closure is replaced by a
//!   newer `set_work` on the same slot.
//! - **Running work is untouched**: a `set_work` issued while the slot's
//!   closure is running is picked up on the next pass.
//! - **Unknown handle** panics ([`HandleError`]).
//! - **Shutdown** runs whatever is already queued, then joins the thread.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{error, info_span};

use super::scheduler::Work;
use crate::error::{HandleError, RuntimeError};

/// Identifies an executor slot. Dense, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkHandle(usize);

impl WorkHandle {
    /// Slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

struct Slot {
    name: String,
    work: Option<Work>,
}

#[derive(Default)]
struct Table {
    slots: Vec<Slot>,
    pending: bool,
    running: bool,
    stopping: bool,
}

#[derive(Default)]
struct Shared {
    table: Mutex<Table>,
    wake: Condvar,
    idle: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Single-threaded executor for heavy work.
pub struct Executor {
    name: String,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Executor {
    /// Starts the worker thread under the given name.
    pub fn spawn(name: &str) -> Result<Arc<Self>, RuntimeError> {
        let shared = Arc::new(Shared::default());
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || worker_loop(&shared)
            })
            .map_err(|source| RuntimeError::WorkerSpawn {
                name: name.to_string(),
                source,
            })?;

        Ok(Arc::new(Self {
            name: name.to_string(),
            shared,
            worker: Mutex::new(Some(worker)),
        }))
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a fresh, empty slot.
    pub fn create(&self, name: &str) -> WorkHandle {
        let mut table = self.shared.lock();
        table.slots.push(Slot {
            name: name.to_string(),
            work: None,
        });
        WorkHandle(table.slots.len() - 1)
    }

    /// Stores `work` in the slot (replacing queued work) and wakes the worker.
    ///
    /// # Panics
    /// Panics if `handle` was not issued by this executor.
    pub fn set_work<F>(&self, handle: WorkHandle, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(e) = self.try_set_work(handle, Box::new(work)) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`Executor::set_work`].
    pub fn try_set_work(&self, handle: WorkHandle, work: Work) -> Result<(), HandleError> {
        let mut table = self.shared.lock();
        let len = table.slots.len();
        let slot = table.slots.get_mut(handle.0).ok_or(HandleError::Executor {
            handle: handle.0,
            slots: len,
        })?;
        slot.work = Some(work);
        table.pending = true;
        drop(table);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Blocks until nothing is queued and nothing is running.
    pub fn wait_idle(&self) {
        let mut table = self.shared.lock();
        while (table.pending || table.running) && !table.stopping {
            table = self
                .shared
                .idle
                .wait(table)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Runs already queued work, then stops and joins the worker thread.
    ///
    /// Blocking; idempotent.
    pub fn shutdown(&self) {
        self.shared.lock().stopping = true;
        self.shared.wake.notify_one();
        self.shared.idle.notify_all();

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                error!(executor = %self.name, "worker thread panicked");
            }
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        {
            let mut table = shared.lock();
            while !table.pending && !table.stopping {
                table = shared.wake.wait(table).unwrap_or_else(PoisonError::into_inner);
            }
            if !table.pending {
                break;
            }
            table.pending = false;
            table.running = true;
        }

        let mut idx = 0;
        loop {
            let next = {
                let mut table = shared.lock();
                let Some(slot) = table.slots.get_mut(idx) else {
                    break;
                };
                slot.work.take().map(|w| (slot.name.clone(), w))
            };
            idx += 1;

            if let Some((name, work)) = next {
                let _span = info_span!("heavy", slot = %name).entered();
                if catch_unwind(AssertUnwindSafe(work)).is_err() {
                    error!(slot = %name, "heavy work panicked");
                }
            }
        }

        let mut table = shared.lock();
        table.running = false;
        if !table.pending {
            shared.idle.notify_all();
        }
    }
}
