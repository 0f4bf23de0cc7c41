//! # Actuator port.
//!
//! The controller hands every admitted refresh-rate value to an [`Actuator`].
//! Calls happen on the executor thread only, are fire-and-forget and their
//! outcome is never reported back to the controller.
//!
//! ```text
//! RateController ──► Executor thread ──► Actuator::apply(mode, value, forced)
//!                                          ├─► apply_literal_hz   (LiteralHz)
//!                                          └─► apply_indexed_hz   (IndexedHz)
//! ```

mod android;

pub use android::AndroidActuator;

use crate::controller::SwitchMode;

/// Port through which the selected refresh rate reaches the display.
///
/// # Example
/// ```
/// use std::sync::Mutex;
/// use dfps::{Actuator, SwitchMode};
///
/// #[derive(Default)]
/// struct Recorder(Mutex<Vec<String>>);
///
/// impl Actuator for Recorder {
///     fn apply_literal_hz(&self, hz: &str, _forced: bool) {
///         self.0.lock().unwrap().push(format!("hz {hz}"));
///     }
///     fn apply_indexed_hz(&self, idx: &str, _forced: bool) {
///         self.0.lock().unwrap().push(format!("idx {idx}"));
///     }
/// }
///
/// let rec = Recorder::default();
/// rec.apply(SwitchMode::IndexedHz, "2", false);
/// assert_eq!(*rec.0.lock().unwrap(), vec!["idx 2".to_string()]);
/// ```
pub trait Actuator: Send + Sync + 'static {
    /// Applies a literal refresh rate in Hz.
    fn apply_literal_hz(&self, hz: &str, forced: bool);

    /// Applies a display-mode index.
    fn apply_indexed_hz(&self, idx: &str, forced: bool);

    /// Dispatches `value` according to `mode`.
    fn apply(&self, mode: SwitchMode, value: &str, forced: bool) {
        match mode {
            SwitchMode::LiteralHz => self.apply_literal_hz(value, forced),
            SwitchMode::IndexedHz => self.apply_indexed_hz(value, forced),
        }
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
