//! # Bus subscribers.
//!
//! This module provides the [`Subscribe`] trait, the closure adapter
//! [`SubscribeFn`] and the built-in [`SignalLog`].
//!
//! ## Architecture
//! ```text
//! Producer ── publish(&Signal) ──► Bus ──► subscribers of signal.topic()
//!                                            │   (inline, registration order)
//!                                            ├──► RateController handlers
//!                                            ├──► SignalLog
//!                                            └──► custom ...
//! ```

mod log;
mod subscriber;

pub use log::SignalLog;
pub use subscriber::{Subscribe, SubscribeFn};
