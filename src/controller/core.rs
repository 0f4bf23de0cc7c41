//! # Reactive refresh-rate controller.
//!
//! [`RateController`] subscribes to the input, top-app and offscreen topics,
//! folds every signal into its state and requests a switch. Debounces go
//! through the [`Scheduler`], the switch itself through the [`Executor`].
//!
//! ## Architecture
//! ```text
//! Bus::publish ──► RateController::on_signal   (publisher thread, cheap)
//!                    ├─► state update
//!                    ├─► Scheduler::schedule / cancel   (idle, gesture, wakeup)
//!                    └─► Executor::set_work(switch)
//!                                        │
//!                                        ▼  (executor thread)
//!                       resolve hz ──► SwitchGate::admit ──► Actuator::apply
//! ```
//!
//! ## Transitions
//! - **touch/button** pressed: active, switch, idle debounce cancelled.
//!   Both released: after `touch_slack` become idle and switch.
//! - **gesture** start: override with the universal rule, switch, exit
//!   debounce cancelled. Gesture end: after `gesture_slack` drop the override
//!   if it is still the gesture one, then switch.
//! - **top app** changed: track it, forced switch.
//! - **offscreen** entered: override with the offscreen rule, forced switch,
//!   pending exit cancelled. Left: after `gesture_slack` drop the override if
//!   it is still the offscreen one, then forced switch.
//!
//! ## Rules
//! - Lock order is controller state, then scheduler/executor tables.
//! - The actuator is only ever called from the executor thread, outside the
//!   state lock.
//! - Deferred closures hold a `Weak` reference; a dropped controller turns
//!   them into no-ops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use super::config::ControllerConfig;
use super::rules::{OFFSCREEN_RULE, UNIVERSAL_RULE};
use super::switch::SwitchGate;
use crate::actuator::Actuator;
use crate::core::{Executor, Scheduler, TimerHandle, WorkHandle};
use crate::events::{Bus, InputState, Signal, Topic};
use crate::subscribers::Subscribe;

/// Topics the controller reacts to.
const TOPICS: [Topic; 5] = [
    Topic::InputTouch,
    Topic::InputBtn,
    Topic::InputState,
    Topic::TopApp,
    Topic::Offscreen,
];

/// Rule override taking precedence over the top app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Override {
    Gesture,
    Offscreen,
}

impl Override {
    fn rule_key(self) -> &'static str {
        match self {
            Override::Gesture => UNIVERSAL_RULE,
            Override::Offscreen => OFFSCREEN_RULE,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    touch: bool,
    btn: bool,
    active: bool,
    cur_app: String,
    override_app: Option<Override>,
    is_offscreen: bool,
    gate: SwitchGate,
}

struct Timers {
    input: TimerHandle,
    gesture: TimerHandle,
    wakeup: TimerHandle,
}

/// Turns signal edges into refresh-rate switches.
pub struct RateController {
    config: ControllerConfig,
    state: Mutex<State>,
    scheduler: Arc<Scheduler>,
    executor: Arc<Executor>,
    actuator: Arc<dyn Actuator>,
    timers: Timers,
    heavy: WorkHandle,
    me: Weak<RateController>,
}

impl RateController {
    /// Creates the controller and its scheduler/executor slots.
    ///
    /// Call [`RateController::start`] to attach it to a bus.
    pub fn new(
        config: ControllerConfig,
        scheduler: &Arc<Scheduler>,
        executor: &Arc<Executor>,
        actuator: Arc<dyn Actuator>,
    ) -> Arc<Self> {
        let timers = Timers {
            input: scheduler.create("dfps.input"),
            gesture: scheduler.create("dfps.gesture"),
            wakeup: scheduler.create("dfps.wakeup"),
        };
        let heavy = executor.create("dfps.switch");

        Arc::new_cyclic(|me| Self {
            config,
            state: Mutex::new(State::default()),
            scheduler: Arc::clone(scheduler),
            executor: Arc::clone(executor),
            actuator,
            timers,
            heavy,
            me: me.clone(),
        })
    }

    /// Subscribes to the controller's topics.
    pub fn start(self: &Arc<Self>, bus: &Bus) {
        for topic in TOPICS {
            bus.subscribe(topic, Arc::clone(self) as Arc<dyn Subscribe>);
        }
        info!(
            mode = %self.config.tunables.mode,
            rules = self.config.rules.len(),
            actuator = self.actuator.name(),
            "rate controller started"
        );
    }

    /// Configuration in use.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Value the controller would select for the current state.
    pub fn target_hz(&self) -> i32 {
        self.resolve(&self.lock())
    }

    /// Last value handed to the actuator.
    pub fn last_applied(&self) -> Option<i32> {
        self.lock().gate.last_applied()
    }

    /// True while touch or button activity (or its slack) is in effect.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Rule key of the current override (`*` during a gesture, `-` offscreen).
    pub fn override_rule(&self) -> Option<&'static str> {
        self.lock().override_app.map(Override::rule_key)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wraps a method into a closure that runs it if the controller still exists.
    fn deferred(&self, f: fn(&Self)) -> impl FnOnce() + Send + 'static + use<> {
        let me = self.me.clone();
        move || {
            if let Some(me) = me.upgrade() {
                f(&me);
            }
        }
    }

    fn resolve(&self, st: &State) -> i32 {
        let rules = &self.config.rules;
        let rule = match st.override_app {
            Some(o) => rules.lookup(o.rule_key()),
            None => rules.lookup(&st.cur_app),
        };
        rule.pick(st.active)
    }

    fn request_switch(&self) {
        self.executor.set_work(self.heavy, self.deferred(Self::apply_switch));
    }

    fn apply_switch(&self) {
        let admitted = {
            let mut st = self.lock();
            let hz = self.resolve(&st);
            debug!(hz, forced = st.gate.is_forced(), "switch");
            st.gate.admit(hz)
        };
        if let Some((hz, forced)) = admitted {
            self.actuator
                .apply(self.config.tunables.mode, &hz.to_string(), forced);
        }
    }

    fn on_input(&self, st: &mut State) {
        if st.touch || st.btn {
            st.active = true;
            self.request_switch();
            self.scheduler.cancel(self.timers.input);
        } else {
            self.scheduler.schedule(
                self.timers.input,
                self.config.tunables.touch_slack,
                self.deferred(Self::enter_idle),
            );
        }
    }

    fn enter_idle(&self) {
        self.lock().active = false;
        self.request_switch();
    }

    fn on_input_state(&self, st: &mut State, input: InputState) {
        if input.in_gesture {
            st.override_app = Some(Override::Gesture);
            self.request_switch();
            self.scheduler.cancel(self.timers.gesture);
        } else {
            self.scheduler.schedule(
                self.timers.gesture,
                self.config.tunables.gesture_slack,
                self.deferred(Self::exit_gesture),
            );
        }
    }

    fn exit_gesture(&self) {
        let mut st = self.lock();
        if st.override_app == Some(Override::Gesture) {
            st.override_app = None;
            self.request_switch();
        }
    }

    fn on_top_app(&self, st: &mut State, pkg: &str) {
        if pkg == st.cur_app {
            return;
        }
        debug!(from = %st.cur_app, to = %pkg, "top app changed");
        st.cur_app = pkg.to_string();
        st.gate.raise_force();
        self.request_switch();
    }

    /// Entering offscreen also cancels a pending exit, so an exit armed before
    /// re-entry can never clear the offscreen override.
    fn on_offscreen(&self, st: &mut State, is_off: bool) {
        if is_off == st.is_offscreen {
            return;
        }
        st.is_offscreen = is_off;
        if is_off {
            st.override_app = Some(Override::Offscreen);
            st.gate.raise_force();
            self.request_switch();
            self.scheduler.cancel(self.timers.wakeup);
        } else {
            self.scheduler.schedule(
                self.timers.wakeup,
                self.config.tunables.gesture_slack,
                self.deferred(Self::exit_offscreen),
            );
        }
    }

    fn exit_offscreen(&self) {
        let mut st = self.lock();
        if st.override_app == Some(Override::Offscreen) {
            st.override_app = None;
            st.gate.raise_force();
            self.request_switch();
        }
    }
}

impl Subscribe for RateController {
    fn on_signal(&self, signal: &Signal) {
        let mut st = self.lock();
        match signal {
            Signal::InputTouch(pressed) => {
                st.touch = *pressed;
                self.on_input(&mut st);
            }
            Signal::InputBtn(pressed) => {
                st.btn = *pressed;
                self.on_input(&mut st);
            }
            Signal::InputState(input) => self.on_input_state(&mut st, *input),
            Signal::TopApp(pkg) => self.on_top_app(&mut st, pkg),
            Signal::Offscreen(is_off) => self.on_offscreen(&mut st, *is_off),
            Signal::CgroupList { .. } => {}
        }
    }

    fn name(&self) -> &str {
        "rate-controller"
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::controller::SwitchMode;
    use crate::core::{Runtime, RuntimeConfig};

    const CONFIG: &str = "\
* 60 120
- 30 30
com.game 90 144
/touchSlackMs 1000
/gestureSlackMs 500
";

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(SwitchMode, String, bool)>>,
        threads: Mutex<Vec<Option<String>>>,
    }

    impl Recorder {
        fn values(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|c| c.1.clone()).collect()
        }

        fn calls(&self) -> Vec<(SwitchMode, String, bool)> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, mode: SwitchMode, value: &str, forced: bool) {
            let thread = std::thread::current().name().map(str::to_string);
            self.threads.lock().unwrap().push(thread);
            self.calls.lock().unwrap().push((mode, value.to_string(), forced));
        }
    }

    impl Actuator for Recorder {
        fn apply_literal_hz(&self, hz: &str, forced: bool) {
            self.record(SwitchMode::LiteralHz, hz, forced);
        }

        fn apply_indexed_hz(&self, idx: &str, forced: bool) {
            self.record(SwitchMode::IndexedHz, idx, forced);
        }
    }

    struct Harness {
        rt: Runtime,
        ctl: Arc<RateController>,
        rec: Arc<Recorder>,
    }

    impl Harness {
        fn new(text: &str) -> Self {
            let rt = Runtime::start(RuntimeConfig {
                worker_name: "test-heavy".into(),
                ..RuntimeConfig::default()
            })
            .unwrap();
            let rec = Arc::new(Recorder::default());
            let cfg = ControllerConfig::parse(text).unwrap();
            let ctl = RateController::new(
                cfg,
                rt.scheduler(),
                rt.executor(),
                Arc::clone(&rec) as Arc<dyn Actuator>,
            );
            ctl.start(rt.bus());
            Self { rt, ctl, rec }
        }

        fn publish(&self, signal: Signal) {
            self.rt.bus().publish(&signal);
            self.rt.executor().wait_idle();
        }

        async fn advance(&self, ms: u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            self.rt.executor().wait_idle();
        }

        async fn stop(self) {
            // the executor is joined off-runtime; a paused clock would jump past the grace
            tokio::time::resume();
            self.rt.shutdown().await.unwrap();
        }
    }

    fn gesture(in_gesture: bool) -> Signal {
        Signal::InputState(InputState {
            in_hold: false,
            in_swipe: in_gesture,
            in_gesture,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn subscribes_to_all_controller_topics() {
        let h = Harness::new(CONFIG);
        for topic in TOPICS {
            assert!(h.rt.bus().has_subscriber(&topic), "{topic}");
        }
        assert!(!h.rt.bus().has_subscriber(&Topic::CgroupList("top-app".into())));
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn touch_switches_immediately_and_idles_after_slack() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::TopApp("com.game".into()));
        assert_eq!(h.rec.calls(), vec![(SwitchMode::LiteralHz, "90".into(), true)]);

        h.publish(Signal::InputTouch(true));
        assert_eq!(h.rec.values(), ["90", "144"]);
        assert!(h.ctl.is_active());

        h.publish(Signal::InputTouch(false));
        h.advance(999).await;
        assert_eq!(h.rec.values(), ["90", "144"]);
        assert!(h.ctl.is_active());

        h.advance(20).await;
        assert_eq!(h.rec.values(), ["90", "144", "90"]);
        assert!(!h.ctl.is_active());

        h.advance(5000).await;
        assert_eq!(h.rec.values().len(), 3);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repress_before_slack_keeps_active() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::InputTouch(true));
        h.publish(Signal::InputTouch(false));
        h.advance(600).await;
        h.publish(Signal::InputBtn(true));
        h.advance(2000).await;

        assert!(h.ctl.is_active());
        assert_eq!(h.rec.values(), ["120"]);

        h.publish(Signal::InputBtn(false));
        h.advance(1010).await;
        assert_eq!(h.rec.values(), ["120", "60"]);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn identical_unforced_requests_apply_once() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::InputTouch(true));
        h.publish(Signal::InputBtn(true));
        h.publish(Signal::InputTouch(true));

        assert_eq!(h.rec.calls(), vec![(SwitchMode::LiteralHz, "120".into(), false)]);
        assert_eq!(h.ctl.last_applied(), Some(120));
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn offscreen_rule_holds_across_top_app_change() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::TopApp("com.game".into()));
        h.publish(Signal::Offscreen(true));
        assert_eq!(h.ctl.override_rule(), Some(OFFSCREEN_RULE));
        assert_eq!(h.rec.values(), ["90", "30"]);

        h.publish(Signal::TopApp("com.other".into()));
        assert_eq!(h.rec.calls().last(), Some(&(SwitchMode::LiteralHz, "30".into(), true)));

        h.publish(Signal::Offscreen(false));
        h.advance(499).await;
        assert_eq!(h.ctl.target_hz(), 30);
        assert_eq!(h.rec.values(), ["90", "30", "30"]);

        h.advance(20).await;
        assert_eq!(h.ctl.override_rule(), None);
        assert_eq!(h.rec.calls().last(), Some(&(SwitchMode::LiteralHz, "60".into(), true)));
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn offscreen_reentry_cancels_pending_exit_armed_before() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::Offscreen(true));
        h.publish(Signal::Offscreen(false));
        h.advance(200).await;
        h.publish(Signal::Offscreen(true));
        h.advance(1000).await;

        assert_eq!(h.ctl.override_rule(), Some(OFFSCREEN_RULE));
        assert_eq!(h.ctl.target_hz(), 30);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_offscreen_edge_is_ignored() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::Offscreen(true));
        h.publish(Signal::Offscreen(true));
        assert_eq!(h.rec.calls(), vec![(SwitchMode::LiteralHz, "30".into(), true)]);

        h.publish(Signal::Offscreen(false));
        h.publish(Signal::Offscreen(false));
        h.advance(510).await;
        assert_eq!(h.rec.values(), ["30", "60"]);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn regesture_within_slack_keeps_override() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::TopApp("com.game".into()));
        h.publish(gesture(true));
        assert_eq!(h.ctl.override_rule(), Some(UNIVERSAL_RULE));
        assert_eq!(h.rec.values(), ["90", "60"]);

        h.publish(gesture(false));
        h.advance(300).await;
        h.publish(gesture(true));
        h.advance(300).await;
        assert_eq!(h.ctl.override_rule(), Some(UNIVERSAL_RULE));
        assert_eq!(h.rec.values(), ["90", "60"]);

        h.publish(gesture(false));
        h.advance(499).await;
        assert_eq!(h.ctl.override_rule(), Some(UNIVERSAL_RULE));

        h.advance(20).await;
        assert_eq!(h.ctl.override_rule(), None);
        assert_eq!(h.rec.values(), ["90", "60", "90"]);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn gesture_exit_does_not_clear_offscreen_override() {
        let h = Harness::new(CONFIG);
        h.publish(gesture(false));
        h.publish(Signal::Offscreen(true));
        h.advance(600).await;
        assert_eq!(h.ctl.override_rule(), Some(OFFSCREEN_RULE));
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn top_app_change_forces_same_value() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::TopApp("com.a".into()));
        h.publish(Signal::TopApp("com.b".into()));
        h.publish(Signal::TopApp("com.b".into()));

        assert_eq!(
            h.rec.calls(),
            vec![
                (SwitchMode::LiteralHz, "60".into(), true),
                (SwitchMode::LiteralHz, "60".into(), true),
            ]
        );
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn indexed_mode_uses_backdoor_actuator() {
        let h = Harness::new("* -1 -1\n- 1 1\ncom.game 2 0\n/useSfBackdoor 1\n");
        h.publish(Signal::TopApp("com.game".into()));
        h.publish(Signal::InputTouch(true));
        h.publish(Signal::TopApp("com.none".into()));

        assert_eq!(
            h.rec.calls(),
            vec![
                (SwitchMode::IndexedHz, "2".into(), true),
                (SwitchMode::IndexedHz, "0".into(), false),
                (SwitchMode::IndexedHz, "-1".into(), true),
            ]
        );
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn actuator_runs_on_executor_thread() {
        let h = Harness::new(CONFIG);
        h.publish(Signal::InputTouch(true));
        h.publish(Signal::InputTouch(false));
        h.advance(1010).await;

        let threads = h.rec.threads.lock().unwrap().clone();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|t| t.as_deref() == Some("test-heavy")));
        h.stop().await;
    }
}
