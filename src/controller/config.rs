//! # Rule file parsing.
//!
//! Line-oriented UTF-8 text, one directive per line:
//! ```text
//! # comment
//! * -1 -1                  # universal rule (mandatory)
//! - 60 60                  # offscreen rule (mandatory)
//! com.example.app 60 120   # <package> <idle> <active>
//! /touchSlackMs 4000       # /<tunable> <value>
//! /useSfBackdoor 0
//! ```
//!
//! ## Rules
//! - Lines are trimmed of spaces, `\r` and `\n` first; blank and `#` lines are skipped.
//! - A malformed line is logged and skipped ([`SyntaxError`]), never fatal.
//! - Unknown tunables are logged and ignored.
//! - Missing mandatory rules or an hz-class mismatch abort the load ([`ConfigError`]).
//! - Duplicate package rules keep the first definition; redefining `*` or `-`
//!   replaces the earlier value.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::rules::{FpsRule, OFFSCREEN_RULE, RuleTable, SwitchMode, UNIVERSAL_RULE};
use crate::error::{ConfigError, SyntaxError};

/// Default idle-transition slack after the last touch/button release.
pub const DEFAULT_TOUCH_SLACK: Duration = Duration::from_millis(4000);

/// Default slack before a gesture or offscreen override is lifted.
pub const DEFAULT_GESTURE_SLACK: Duration = Duration::from_millis(4000);

/// Lower bound applied to both slack tunables.
pub const MIN_SLACK: Duration = Duration::from_millis(100);

/// Timing and mode knobs of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tunables {
    /// Selected by `/useSfBackdoor` (nonzero → [`SwitchMode::IndexedHz`]).
    pub mode: SwitchMode,
    /// `/touchSlackMs`, clamped to [`MIN_SLACK`].
    pub touch_slack: Duration,
    /// `/gestureSlackMs`, clamped to [`MIN_SLACK`].
    pub gesture_slack: Duration,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            mode: SwitchMode::LiteralHz,
            touch_slack: DEFAULT_TOUCH_SLACK,
            gesture_slack: DEFAULT_GESTURE_SLACK,
        }
    }
}

impl Tunables {
    fn set(&mut self, name: &str, value: i64) -> bool {
        let slack = || Duration::from_millis(value.max(0) as u64).max(MIN_SLACK);
        match name {
            "useSfBackdoor" => self.mode = SwitchMode::from_backdoor(value != 0),
            "touchSlackMs" => self.touch_slack = slack(),
            "gestureSlackMs" => self.gesture_slack = slack(),
            _ => return false,
        }
        true
    }
}

/// One classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive<'a> {
    Skip,
    Tunable { name: &'a str, value: i64 },
    Rule { pkg: &'a str, rule: FpsRule },
}

fn parse_line(line: &str) -> Result<Directive<'_>, SyntaxError> {
    let line = line.trim_matches([' ', '\r', '\n']);
    if line.is_empty() || line.starts_with('#') {
        return Ok(Directive::Skip);
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut tokens = rest.split_whitespace();
        let (Some(name), Some(value)) = (tokens.next(), tokens.next()) else {
            return Err(SyntaxError::BrokenTunable);
        };
        let value = value.parse().map_err(|_| SyntaxError::TunableValue {
            name: name.to_string(),
            value: value.to_string(),
        })?;
        return Ok(Directive::Tunable { name, value });
    }

    let mut tokens = line.split_whitespace();
    let (Some(pkg), Some(idle), Some(active)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(SyntaxError::BrokenRule);
    };
    match (idle.parse(), active.parse()) {
        (Ok(idle), Ok(active)) => Ok(Directive::Rule {
            pkg,
            rule: FpsRule::new(idle, active),
        }),
        _ => Err(SyntaxError::BrokenRule),
    }
}

/// Immutable controller configuration: validated rules plus tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Validated rule table.
    pub rules: RuleTable,
    /// Timing and mode knobs.
    pub tunables: Tunables,
}

impl ControllerConfig {
    /// Reads and parses a rule file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "loading config");
        Self::parse(&text)
    }

    /// Parses rule file text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut tunables = Tunables::default();
        let mut universal = None;
        let mut offscreen = None;
        let mut packages = BTreeMap::new();

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            match parse_line(line) {
                Ok(Directive::Skip) => {}
                Ok(Directive::Tunable { name, value }) => {
                    if tunables.set(name, value) {
                        debug!("set '{name}'={value}");
                    } else {
                        warn!(line = lineno, "unknown tunable '{name}' in the config file");
                    }
                }
                Ok(Directive::Rule { pkg, rule }) => {
                    let slot = match pkg {
                        UNIVERSAL_RULE => &mut universal,
                        OFFSCREEN_RULE => &mut offscreen,
                        _ => {
                            match packages.entry(pkg.to_string()) {
                                Entry::Vacant(e) => {
                                    debug!("load '{pkg}', dfps={}/{}", rule.idle, rule.active);
                                    e.insert(rule);
                                }
                                Entry::Occupied(_) => {
                                    warn!(line = lineno, "duplicate rule for '{pkg}' ignored");
                                }
                            }
                            continue;
                        }
                    };
                    if slot.replace(rule).is_some() {
                        warn!(line = lineno, "rule '{pkg}' redefined");
                    }
                }
                Err(e) => {
                    warn!(line = lineno, reason = e.as_label(), "skipped broken line '{}': {e}", line.trim());
                }
            }
        }

        let rules = RuleTable::build(universal, offscreen, packages, tunables.mode)?;
        match tunables.mode {
            SwitchMode::IndexedHz => info!("use surfaceflinger backdoor to switch refresh rate"),
            SwitchMode::LiteralHz => info!("use peak_refresh_rate to switch refresh rate"),
        }
        Ok(Self { rules, tunables })
    }
}
