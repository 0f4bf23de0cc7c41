//! # SignalLog — signal tracer
//!
//! A minimal subscriber that writes every incoming [`Signal`] to the `tracing`
//! log at debug level. Useful while tuning a rule file.
//!
//! ## Example output
//! ```text
//! DEBUG dfps::subscribers::log: [touch] pressed=true
//! DEBUG dfps::subscribers::log: [scene] hold=false swipe=false gesture=true
//! DEBUG dfps::subscribers::log: [topapp] pkg="com.example.app"
//! DEBUG dfps::subscribers::log: [offscreen] off=true
//! DEBUG dfps::subscribers::log: [cgroup] group="top-app" tasks=12
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::events::Signal;
use crate::subscribers::Subscribe;

/// Signal logging subscriber.
#[derive(Default)]
pub struct SignalLog {
    seen: AtomicU64,
}

impl SignalLog {
    /// Construct a new [`SignalLog`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of signals logged so far.
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

impl Subscribe for SignalLog {
    fn on_signal(&self, signal: &Signal) {
        self.seen.fetch_add(1, Ordering::Relaxed);
        match signal {
            Signal::InputTouch(pressed) => debug!("[touch] pressed={pressed}"),
            Signal::InputBtn(pressed) => debug!("[btn] pressed={pressed}"),
            Signal::InputState(s) => debug!(
                "[scene] hold={} swipe={} gesture={}",
                s.in_hold, s.in_swipe, s.in_gesture
            ),
            Signal::TopApp(pkg) => debug!("[topapp] pkg={pkg:?}"),
            Signal::Offscreen(off) => debug!("[offscreen] off={off}"),
            Signal::CgroupList { group, pids } => {
                debug!("[cgroup] group={group:?} tasks={}", pids.len())
            }
        }
    }

    fn name(&self) -> &str {
        "SignalLog"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::events::{Bus, Topic};

    #[test]
    fn counts_every_delivered_signal() {
        let bus = Bus::new();
        let log = Arc::new(SignalLog::new());
        bus.subscribe(Topic::InputTouch, log.clone());
        bus.subscribe(Topic::Offscreen, log.clone());

        bus.publish(&Signal::InputTouch(true));
        bus.publish(&Signal::Offscreen(false));
        bus.publish(&Signal::TopApp("com.example".into()));

        assert_eq!(log.seen(), 2);
    }
}
