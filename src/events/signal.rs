//! # Topics and their payloads.
//!
//! Every topic has exactly one payload shape. Instead of a topic string plus an
//! untyped pointer, producers publish a [`Signal`]; its [`Topic`] is derived from
//! the variant, so a payload can never travel on the wrong topic.
//!
//! | Topic                | Payload                               |
//! |----------------------|---------------------------------------|
//! | `input.touch`        | `bool` (pressed)                      |
//! | `input.btn`          | `bool` (pressed)                      |
//! | `input.state`        | [`InputState`]                        |
//! | `topapp.pkgName`     | `String`                              |
//! | `offscreen.state`    | `bool`                                |
//! | `cgroup.<name>.list` | ordered pids (`Vec<i32>`)             |
//!
//! ## Text form
//! [`Signal`] implements [`FromStr`] for lines of the form `<topic> <payload>`:
//! ```text
//! input.touch 1
//! input.state 0 1 0          # in_hold in_swipe in_gesture
//! topapp.pkgName com.example.app
//! offscreen.state true
//! cgroup.top-app.list 1021 1400
//! ```

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::SignalParseError;

/// Named channel on the [`Bus`](crate::Bus).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `input.touch`
    InputTouch,
    /// `input.btn`
    InputBtn,
    /// `input.state`
    InputState,
    /// `topapp.pkgName`
    TopApp,
    /// `offscreen.state`
    Offscreen,
    /// `cgroup.<name>.list`
    CgroupList(String),
}

impl Topic {
    /// Stable string key of the topic.
    pub fn key(&self) -> Cow<'static, str> {
        match self {
            Topic::InputTouch => Cow::Borrowed("input.touch"),
            Topic::InputBtn => Cow::Borrowed("input.btn"),
            Topic::InputState => Cow::Borrowed("input.state"),
            Topic::TopApp => Cow::Borrowed("topapp.pkgName"),
            Topic::Offscreen => Cow::Borrowed("offscreen.state"),
            Topic::CgroupList(name) => Cow::Owned(format!("cgroup.{name}.list")),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Topic {
    type Err = SignalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input.touch" => Ok(Topic::InputTouch),
            "input.btn" => Ok(Topic::InputBtn),
            "input.state" => Ok(Topic::InputState),
            "topapp.pkgName" => Ok(Topic::TopApp),
            "offscreen.state" => Ok(Topic::Offscreen),
            other => other
                .strip_prefix("cgroup.")
                .and_then(|rest| rest.strip_suffix(".list"))
                .filter(|name| !name.is_empty())
                .map(|name| Topic::CgroupList(name.to_string()))
                .ok_or_else(|| SignalParseError::UnknownTopic(other.to_string())),
        }
    }
}

/// Classified input scene published on `input.state`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    /// A finger rests on the screen without moving.
    pub in_hold: bool,
    /// A swipe is in progress.
    pub in_swipe: bool,
    /// A system gesture (edge swipe, navigation) is in progress.
    pub in_gesture: bool,
}

/// A payload together with the topic it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Touch screen pressed/released.
    InputTouch(bool),
    /// Hardware button pressed/released.
    InputBtn(bool),
    /// Input scene classification.
    InputState(InputState),
    /// Foreground package name.
    TopApp(String),
    /// Device is offscreen (screen off while tasks keep running).
    Offscreen(bool),
    /// Task list of a cgroup.
    CgroupList {
        /// Cgroup name, e.g. `top-app`.
        group: String,
        /// Process ids in cgroup order.
        pids: Vec<i32>,
    },
}

impl Signal {
    /// Topic this payload is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Signal::InputTouch(_) => Topic::InputTouch,
            Signal::InputBtn(_) => Topic::InputBtn,
            Signal::InputState(_) => Topic::InputState,
            Signal::TopApp(_) => Topic::TopApp,
            Signal::Offscreen(_) => Topic::Offscreen,
            Signal::CgroupList { group, .. } => Topic::CgroupList(group.clone()),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

impl FromStr for Signal {
    type Err = SignalParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (key, payload) = match line.split_once(char::is_whitespace) {
            Some((key, rest)) => (key, rest.trim()),
            None if line.is_empty() => return Err(SignalParseError::Empty),
            None => (line, ""),
        };
        let topic: Topic = key.parse()?;
        let bad = || SignalParseError::Payload {
            topic: key.to_string(),
            payload: payload.to_string(),
        };

        let signal = match topic {
            Topic::InputTouch => Signal::InputTouch(parse_bool(payload).ok_or_else(bad)?),
            Topic::InputBtn => Signal::InputBtn(parse_bool(payload).ok_or_else(bad)?),
            Topic::Offscreen => Signal::Offscreen(parse_bool(payload).ok_or_else(bad)?),
            Topic::InputState => {
                let flags = payload
                    .split_whitespace()
                    .map(parse_bool)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(bad)?;
                let [in_hold, in_swipe, in_gesture] = flags[..] else {
                    return Err(bad());
                };
                Signal::InputState(InputState {
                    in_hold,
                    in_swipe,
                    in_gesture,
                })
            }
            Topic::TopApp => {
                if payload.is_empty() || payload.contains(char::is_whitespace) {
                    return Err(bad());
                }
                Signal::TopApp(payload.to_string())
            }
            Topic::CgroupList(group) => {
                let pids = payload
                    .split_whitespace()
                    .map(|p| p.parse().ok())
                    .collect::<Option<Vec<i32>>>()
                    .ok_or_else(bad)?;
                Signal::CgroupList { group, pids }
            }
        };
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_keys_are_stable() {
        assert_eq!(Topic::InputTouch.to_string(), "input.touch");
        assert_eq!(Topic::TopApp.to_string(), "topapp.pkgName");
        assert_eq!(
            Topic::CgroupList("top-app".into()).to_string(),
            "cgroup.top-app.list"
        );
        assert_eq!(
            "cgroup.background.list".parse::<Topic>().unwrap(),
            Topic::CgroupList("background".into())
        );
        assert!("cgroup..list".parse::<Topic>().is_err());
    }

    #[test]
    fn signal_topic_follows_variant() {
        let sig = Signal::CgroupList {
            group: "top-app".into(),
            pids: vec![1, 2],
        };
        assert_eq!(sig.topic(), Topic::CgroupList("top-app".into()));
        assert_eq!(Signal::Offscreen(true).topic(), Topic::Offscreen);
    }

    #[test]
    fn parses_text_lines() {
        assert_eq!("input.touch 1".parse::<Signal>(), Ok(Signal::InputTouch(true)));
        assert_eq!("input.btn false".parse::<Signal>(), Ok(Signal::InputBtn(false)));
        assert_eq!(
            "input.state 0 0 1".parse::<Signal>(),
            Ok(Signal::InputState(InputState {
                in_hold: false,
                in_swipe: false,
                in_gesture: true,
            }))
        );
        assert_eq!(
            "topapp.pkgName  com.example.app ".parse::<Signal>(),
            Ok(Signal::TopApp("com.example.app".into()))
        );
        assert_eq!(
            "cgroup.top-app.list 10 11".parse::<Signal>(),
            Ok(Signal::CgroupList {
                group: "top-app".into(),
                pids: vec![10, 11],
            })
        );
    }

    #[test]
    fn rejects_bad_lines() {
        assert_eq!("".parse::<Signal>(), Err(SignalParseError::Empty));
        assert_eq!(
            "input.swipe 1".parse::<Signal>(),
            Err(SignalParseError::UnknownTopic("input.swipe".into()))
        );
        assert!(matches!(
            "input.touch yes".parse::<Signal>(),
            Err(SignalParseError::Payload { .. })
        ));
        assert!("input.state 0 1".parse::<Signal>().is_err());
        assert!("topapp.pkgName".parse::<Signal>().is_err());
    }
}
