//! # Core subscriber trait
//!
//! [`Subscribe`] is the extension point for reacting to signals on the
//! [`Bus`](crate::Bus). Callbacks run **inline** on the publisher's thread, in
//! registration order, so implementations must be cheap: update some state,
//! arm a timer, hand heavy work to the [`Executor`](crate::Executor).
//!
//! Closures are adapted through [`SubscribeFn`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use dfps::{Bus, Signal, Subscribe, Topic};
//!
//! struct Audit;
//!
//! impl Subscribe for Audit {
//!     fn on_signal(&self, signal: &Signal) {
//!         let _ = signal;
//!     }
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//! }
//!
//! let bus = Bus::new();
//! bus.subscribe(Topic::InputTouch, Arc::new(Audit));
//! assert!(bus.has_subscriber(&Topic::InputTouch));
//! ```

use std::borrow::Cow;

use crate::events::Signal;

/// Contract for bus subscribers.
///
/// Called synchronously from whichever thread publishes. A panic is **not**
/// caught by the bus; it unwinds into the publisher.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single signal.
    fn on_signal(&self, signal: &Signal);

    /// Human-readable name (for logs).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Function-backed subscriber.
#[derive(Debug)]
pub struct SubscribeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> SubscribeFn<F>
where
    F: Fn(&Signal) + Send + Sync + 'static,
{
    /// Wraps a closure under the given name.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Subscribe for SubscribeFn<F>
where
    F: Fn(&Signal) + Send + Sync + 'static,
{
    fn on_signal(&self, signal: &Signal) {
        (self.f)(signal)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
