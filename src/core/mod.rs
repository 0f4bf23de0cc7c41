//! Runtime core: the execution contexts.
//!
//! The public API of this module is [`Runtime`] plus the two workers it owns.
//!
//! Internal modules:
//! - [`scheduler`]: debounce timers multiplexed onto one delivery task;
//! - [`executor`]: one dedicated thread serializing heavy work;
//! - [`runtime`]: builds the bus and both workers, drives shutdown;
//! - [`config`]: runtime settings;
//! - [`shutdown`]: OS termination signal handling.

mod config;
mod executor;
mod runtime;
mod scheduler;
mod shutdown;

pub use config::RuntimeConfig;
pub use executor::{Executor, WorkHandle};
pub use runtime::Runtime;
pub use scheduler::{MIN_INTERVAL, Scheduler, TimerHandle, Work};
