//! Signals: topics, typed payloads and the publish/subscribe bus.
//!
//! ## Contents
//! - [`Topic`], [`Signal`], [`InputState`] the payload contract per topic
//! - [`Bus`] synchronous topic registry
//! - [`feed_signals`] publishes text signal lines from a reader
//!
//! ## Quick reference
//! - **Publishers**: external producers (input, top-app, offscreen, cgroup
//!   monitors) and the binary's stdin feed.
//! - **Consumers**: [`RateController`](crate::RateController) handlers and
//!   [`SignalLog`](crate::SignalLog).

mod bus;
mod feed;
mod signal;

pub use bus::Bus;
pub use feed::feed_signals;
pub use signal::{InputState, Signal, Topic};
