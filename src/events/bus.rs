//! # Topic registry with synchronous fan-out.
//!
//! [`Bus`] maps each [`Topic`] to an ordered list of subscribers. Publishing
//! calls them **inline** on the caller's thread; there is no queue, no retry and
//! no thread hop.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                       Subscribers of the topic:
//!   input monitor ──┐
//!   top-app     ────┼──► Bus::publish(&Signal) ──► sub #1 ──► sub #2 ──► ...
//!   offscreen   ────┘     (caller's thread)        (registration order)
//! ```
//!
//! ## Rules
//! - **Synchronous**: `publish()` returns after every subscriber returned.
//! - **Ordered**: subscribers of one topic run in registration order.
//! - **No unsubscribe**: registrations live as long as the bus.
//! - **Late subscribers** only see signals published after they registered.
//! - **Reentrant**: the subscriber list is snapshotted before delivery, so a
//!   callback may subscribe or publish without deadlocking.
//! - **Panics are not caught**: they unwind into the publisher.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::signal::{Signal, Topic};
use crate::subscribers::{Subscribe, SubscribeFn};

/// In-process publish/subscribe registry.
#[derive(Default)]
pub struct Bus {
    topics: RwLock<HashMap<Topic, Vec<Arc<dyn Subscribe>>>>,
}

impl Bus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` to every subscriber of `signal.topic()`.
    ///
    /// Does nothing when the topic has no subscribers.
    pub fn publish(&self, signal: &Signal) {
        let subs = {
            let topics = self.topics.read().unwrap_or_else(PoisonError::into_inner);
            match topics.get(&signal.topic()) {
                Some(subs) => subs.clone(),
                None => return,
            }
        };
        for sub in &subs {
            sub.on_signal(signal);
        }
    }

    /// Appends a subscriber to the topic's list.
    pub fn subscribe(&self, topic: Topic, sub: Arc<dyn Subscribe>) {
        let mut topics = self.topics.write().unwrap_or_else(PoisonError::into_inner);
        topics.entry(topic).or_default().push(sub);
    }

    /// Appends a closure subscriber to the topic's list.
    pub fn subscribe_fn<F>(&self, topic: Topic, name: &'static str, f: F)
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(SubscribeFn::new(name, f)));
    }

    /// Returns true if at least one subscriber listens on `topic`.
    ///
    /// Producers use this to skip expensive sampling nobody would consume.
    pub fn has_subscriber(&self, topic: &Topic) -> bool {
        self.topics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(topic)
    }
}
