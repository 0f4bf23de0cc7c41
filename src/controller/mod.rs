//! # Refresh-rate controller.
//!
//! - [`rules`]: rule table and hz-class validation.
//! - [`config`]: rule file parsing and tunables.
//! - [`SwitchGate`]: suppression of unchanged values and the force flag.
//! - [`RateController`]: the reactive state machine wired to the bus.

pub mod config;
pub mod rules;

mod core;
mod switch;

pub use config::{ControllerConfig, Tunables};
pub use self::core::RateController;
pub use rules::{FpsRule, OFFSCREEN_RULE, RuleTable, SwitchMode, UNIVERSAL_RULE};
pub use switch::SwitchGate;
