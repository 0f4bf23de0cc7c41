//! # Rule table
//!
//! Maps package names to an `(idle, active)` pair. Two entries are mandatory:
//! the universal rule [`UNIVERSAL_RULE`] (fallback for unknown packages) and
//! the offscreen rule [`OFFSCREEN_RULE`].
//!
//! ## Hz classes
//! The values of a rule are either literal refresh rates (`>= 20`, written to
//! the display settings) or display-mode indices (`< 20`, handed to the
//! compositor). Every rule must match the configured [`SwitchMode`], except
//! the pair `(-1, -1)` which means "no override" and is always accepted.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// Key of the universal (fallback) rule.
pub const UNIVERSAL_RULE: &str = "*";

/// Key of the offscreen rule.
pub const OFFSCREEN_RULE: &str = "-";

/// Values below this are display-mode indices, values at or above are Hz.
const MIN_LITERAL_HZ: i32 = 20;

/// `(idle, active)` pair for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FpsRule {
    /// Used while no touch/button is held.
    pub idle: i32,
    /// Used while touch/button is held (and for the slack period after).
    pub active: i32,
}

impl FpsRule {
    /// The "no override" sentinel `(-1, -1)`.
    pub const NO_OVERRIDE: FpsRule = FpsRule {
        idle: -1,
        active: -1,
    };

    /// Creates a rule.
    pub const fn new(idle: i32, active: i32) -> Self {
        Self { idle, active }
    }

    /// Value for the given activity state.
    pub fn pick(self, active: bool) -> i32 {
        if active { self.active } else { self.idle }
    }
}

/// How a selected value reaches the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitchMode {
    /// Values are Hz, written to the refresh-rate settings.
    #[default]
    LiteralHz,
    /// Values are display-mode indices, sent to the compositor backdoor.
    IndexedHz,
}

impl SwitchMode {
    /// Mode selected by the `useSfBackdoor` tunable.
    pub fn from_backdoor(use_sf_backdoor: bool) -> Self {
        if use_sf_backdoor {
            SwitchMode::IndexedHz
        } else {
            SwitchMode::LiteralHz
        }
    }

    /// Returns true if `rule` is usable in this mode.
    pub fn accepts(self, rule: FpsRule) -> bool {
        if rule == FpsRule::NO_OVERRIDE {
            return true;
        }
        let values = [rule.idle, rule.active];
        match self {
            SwitchMode::LiteralHz => values.iter().all(|&v| v >= MIN_LITERAL_HZ),
            SwitchMode::IndexedHz => values.iter().all(|&v| v < MIN_LITERAL_HZ),
        }
    }
}

impl fmt::Display for SwitchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchMode::LiteralHz => f.write_str("literal-hz"),
            SwitchMode::IndexedHz => f.write_str("indexed"),
        }
    }
}

/// Validated, immutable rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    universal: FpsRule,
    offscreen: FpsRule,
    packages: BTreeMap<String, FpsRule>,
}

impl RuleTable {
    /// Validates the collected rules against `mode`.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// offscreen present, universal present, then hz classes of offscreen,
    /// universal and packages (lexical order).
    pub fn build(
        universal: Option<FpsRule>,
        offscreen: Option<FpsRule>,
        packages: BTreeMap<String, FpsRule>,
        mode: SwitchMode,
    ) -> Result<Self, ConfigError> {
        let offscreen = offscreen.ok_or(ConfigError::MissingRule {
            rule: OFFSCREEN_RULE,
        })?;
        let universal = universal.ok_or(ConfigError::MissingRule {
            rule: UNIVERSAL_RULE,
        })?;

        let all = [(OFFSCREEN_RULE, &offscreen), (UNIVERSAL_RULE, &universal)]
            .into_iter()
            .chain(packages.iter().map(|(name, rule)| (name.as_str(), rule)));
        for (name, rule) in all {
            if !mode.accepts(*rule) {
                return Err(ConfigError::InvalidRule {
                    rule: name.to_string(),
                    idle: rule.idle,
                    active: rule.active,
                    mode,
                });
            }
        }

        Ok(Self {
            universal,
            offscreen,
            packages,
        })
    }

    /// Rule for `pkg`: the offscreen rule for [`OFFSCREEN_RULE`], the package's
    /// own rule if configured, otherwise the universal rule.
    pub fn lookup(&self, pkg: &str) -> FpsRule {
        if pkg == OFFSCREEN_RULE {
            return self.offscreen;
        }
        self.packages.get(pkg).copied().unwrap_or(self.universal)
    }

    /// The universal rule.
    pub fn universal(&self) -> FpsRule {
        self.universal
    }

    /// The offscreen rule.
    pub fn offscreen(&self) -> FpsRule {
        self.offscreen
    }

    /// Number of package-specific rules.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// True if only the mandatory rules exist.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkgs(list: &[(&str, i32, i32)]) -> BTreeMap<String, FpsRule> {
        list.iter()
            .map(|&(n, i, a)| (n.to_string(), FpsRule::new(i, a)))
            .collect()
    }

    #[test]
    fn literal_mode_requires_both_values_at_least_20() {
        let m = SwitchMode::LiteralHz;
        assert!(m.accepts(FpsRule::new(60, 120)));
        assert!(m.accepts(FpsRule::new(20, 20)));
        assert!(!m.accepts(FpsRule::new(19, 120)));
        assert!(!m.accepts(FpsRule::new(60, 2)));
        assert!(m.accepts(FpsRule::NO_OVERRIDE));
        assert!(!m.accepts(FpsRule::new(-1, 60)));
    }

    #[test]
    fn indexed_mode_requires_both_values_below_20() {
        let m = SwitchMode::IndexedHz;
        assert!(m.accepts(FpsRule::new(2, 0)));
        assert!(m.accepts(FpsRule::new(-1, 1)));
        assert!(!m.accepts(FpsRule::new(2, 60)));
        assert!(m.accepts(FpsRule::NO_OVERRIDE));
    }

    #[test]
    fn missing_offscreen_is_reported_before_universal() {
        let err = RuleTable::build(None, None, BTreeMap::new(), SwitchMode::LiteralHz)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRule { rule: "-" }));

        let err = RuleTable::build(
            None,
            Some(FpsRule::new(60, 60)),
            BTreeMap::new(),
            SwitchMode::LiteralHz,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRule { rule: "*" }));
    }

    #[test]
    fn first_inconsistent_rule_is_named() {
        let err = RuleTable::build(
            Some(FpsRule::NO_OVERRIDE),
            Some(FpsRule::new(60, 60)),
            pkgs(&[("com.b", 1, 2), ("com.a", 60, 120), ("com.c", 3, 4)]),
            SwitchMode::LiteralHz,
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidRule { rule, idle, active, mode } => {
                assert_eq!(rule, "com.b");
                assert_eq!((idle, active), (1, 2));
                assert_eq!(mode, SwitchMode::LiteralHz);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sentinel_rules_are_checked_first() {
        let err = RuleTable::build(
            Some(FpsRule::new(60, 120)),
            Some(FpsRule::new(60, 60)),
            pkgs(&[("com.a", 1, 2)]),
            SwitchMode::IndexedHz,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { ref rule, .. } if rule == "-"));
    }

    #[test]
    fn lookup_falls_back_to_universal() {
        let table = RuleTable::build(
            Some(FpsRule::new(60, 120)),
            Some(FpsRule::new(30, 30)),
            pkgs(&[("com.game", 90, 144)]),
            SwitchMode::LiteralHz,
        )
        .unwrap();

        assert_eq!(table.lookup("com.game"), FpsRule::new(90, 144));
        assert_eq!(table.lookup("com.unknown"), FpsRule::new(60, 120));
        assert_eq!(table.lookup(UNIVERSAL_RULE), FpsRule::new(60, 120));
        assert_eq!(table.lookup(OFFSCREEN_RULE), FpsRule::new(30, 30));
        assert_eq!(table.lookup(""), FpsRule::new(60, 120));
        assert_eq!(table.len(), 1);
    }
}
