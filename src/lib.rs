//! # dfps
//!
//! **dfps** is a reactive display refresh-rate controller.
//!
//! It fuses touch/button activity, gestures, the foreground application and
//! an offscreen condition into a target refresh rate, and hands that value to
//! an actuator without ever blocking the thread that published the signal.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ input monitor│   │ top-app probe│   │  offscreen   │   (external producers)
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Bus (topic registry, synchronous fan-out)                │
//! └──────┬───────────────────────────────────────────┬────────┘
//!        ▼                                           ▼
//! ┌─────────────────────────────┐              ┌───────────┐
//! │ RateController              │              │ SignalLog │
//! │  - rule table + tunables    │              └───────────┘
//! │  - touch/gesture/offscreen  │
//! └──────┬───────────────┬──────┘
//!        │ debounce      │ switch request
//!        ▼               ▼
//! ┌─────────────┐  ┌──────────────────┐     ┌─────────────────────┐
//! │  Scheduler  │─►│ Executor thread  │────►│ Actuator            │
//! │ (one tokio  │  │ (heavy work,     │     │ literal Hz / indexed│
//! │  task)      │  │  serialized)     │     └─────────────────────┘
//! └─────────────┘  └──────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Runtime::start(cfg) ──► Bus + Scheduler task + Executor thread
//! ControllerConfig::load(path) ──► RateController::new(..) ──► start(&bus)
//!
//! producers ──► Bus::publish(&Signal) ──► controller state ──► switch
//!
//! Runtime::run_until_signal()
//!   ├─► SIGINT/SIGTERM/SIGQUIT or token cancel
//!   └─► shutdown(): scheduler joined, executor drained and joined (within grace)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                         |
//! |-------------------|----------------------------------------------------------|--------------------------------------------|
//! | **Signals**       | Typed topics and payloads, text form for feeds.          | [`Topic`], [`Signal`], [`InputState`]      |
//! | **Bus**           | Synchronous publish/subscribe.                           | [`Bus`], [`Subscribe`], [`SubscribeFn`]    |
//! | **Timers**        | Debounce slots multiplexed onto one timer.               | [`Scheduler`], [`TimerHandle`]             |
//! | **Heavy work**    | One thread serializing slow work.                        | [`Executor`], [`WorkHandle`]               |
//! | **Rules**         | Rule file parsing and validation.                        | [`ControllerConfig`], [`RuleTable`]        |
//! | **Controller**    | Signal edges to refresh-rate switches.                   | [`RateController`], [`SwitchGate`]         |
//! | **Actuation**     | Port to the display, Android implementation.             | [`Actuator`], [`AndroidActuator`]          |
//! | **Errors**        | Typed errors with stable labels.                         | [`ConfigError`], [`RuntimeError`]          |
//!
//! ## Example
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use dfps::{Actuator, ControllerConfig, RateController, Runtime, RuntimeConfig, Signal};
//!
//! #[derive(Default)]
//! struct Last(Mutex<Option<String>>);
//!
//! impl Actuator for Last {
//!     fn apply_literal_hz(&self, hz: &str, _forced: bool) {
//!         *self.0.lock().unwrap() = Some(hz.to_string());
//!     }
//!     fn apply_indexed_hz(&self, _idx: &str, _forced: bool) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rt = Runtime::start(RuntimeConfig::default())?;
//!     let cfg = ControllerConfig::parse("* 60 120\n- 60 60\ncom.example.app 90 144\n")?;
//!
//!     let last = Arc::new(Last::default());
//!     let ctl = RateController::new(cfg, rt.scheduler(), rt.executor(), last.clone());
//!     ctl.start(rt.bus());
//!
//!     rt.bus().publish(&Signal::TopApp("com.example.app".into()));
//!     rt.bus().publish(&Signal::InputTouch(true));
//!     rt.executor().wait_idle();
//!     assert_eq!(last.0.lock().unwrap().as_deref(), Some("144"));
//!
//!     rt.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod actuator;
mod controller;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use actuator::{Actuator, AndroidActuator};
pub use controller::{
    ControllerConfig, FpsRule, OFFSCREEN_RULE, RateController, RuleTable, SwitchGate, SwitchMode,
    Tunables, UNIVERSAL_RULE,
};
pub use self::core::{
    Executor, MIN_INTERVAL, Runtime, RuntimeConfig, Scheduler, TimerHandle, Work, WorkHandle,
};
pub use error::{ConfigError, HandleError, RuntimeError, SignalParseError, SyntaxError};
pub use events::{Bus, InputState, Signal, Topic, feed_signals};
pub use subscribers::{SignalLog, Subscribe, SubscribeFn};
