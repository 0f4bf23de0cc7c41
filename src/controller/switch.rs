//! # Switch suppression.
//!
//! [`SwitchGate`] decides whether a resolved refresh-rate value reaches the
//! actuator. It remembers the last applied value and a pending force flag
//! shared by every switch request.
//!
//! ## Rules
//! - `admit` clears the force flag on every call, applied or not.
//! - A value is applied if it differs from the last applied one, or if the
//!   force flag was raised when `admit` was entered.
//! - Force is not attached to a particular request: two forced requests that
//!   collapse into one executor run produce a single forced apply, and the run
//!   after that is no longer forced.

/// Tracks the last applied value and the pending force flag.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SwitchGate {
    last_applied: Option<i32>,
    force_pending: bool,
}

impl SwitchGate {
    /// Creates a gate with nothing applied yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the next `admit` as forced.
    pub fn raise_force(&mut self) {
        self.force_pending = true;
    }

    /// True if the next `admit` will be forced.
    pub fn is_forced(&self) -> bool {
        self.force_pending
    }

    /// Last value handed to the actuator.
    pub fn last_applied(&self) -> Option<i32> {
        self.last_applied
    }

    /// Consumes the force flag and returns `Some((hz, forced))` when the
    /// actuator must run.
    pub fn admit(&mut self, hz: i32) -> Option<(i32, bool)> {
        let forced = std::mem::take(&mut self.force_pending);
        if !forced && self.last_applied == Some(hz) {
            return None;
        }
        self.last_applied = Some(hz);
        Some((hz, forced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_is_always_applied() {
        let mut gate = SwitchGate::new();
        assert_eq!(gate.admit(60), Some((60, false)));
        assert_eq!(gate.last_applied(), Some(60));
    }

    #[test]
    fn unchanged_value_is_suppressed() {
        let mut gate = SwitchGate::new();
        gate.admit(60);
        assert_eq!(gate.admit(60), None);
        assert_eq!(gate.admit(120), Some((120, false)));
    }

    #[test]
    fn forced_switch_reapplies_same_value() {
        let mut gate = SwitchGate::new();
        gate.admit(60);
        gate.raise_force();
        assert_eq!(gate.admit(60), Some((60, true)));
        assert!(!gate.is_forced());
    }

    #[test]
    fn force_is_consumed_by_the_next_admit_only() {
        let mut gate = SwitchGate::new();
        gate.admit(60);
        gate.raise_force();
        gate.raise_force();
        assert_eq!(gate.admit(60), Some((60, true)));
        assert_eq!(gate.admit(60), None);
    }

    #[test]
    fn force_is_consumed_even_when_value_changes() {
        let mut gate = SwitchGate::new();
        gate.admit(60);
        gate.raise_force();
        assert_eq!(gate.admit(90), Some((90, true)));
        assert_eq!(gate.admit(120), Some((120, false)));
    }

    #[test]
    fn sentinel_value_passes_through() {
        let mut gate = SwitchGate::new();
        assert_eq!(gate.admit(-1), Some((-1, false)));
        assert_eq!(gate.admit(-1), None);
    }
}
