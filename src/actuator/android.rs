//! Android implementation of [`Actuator`] built on the platform shell tools.
//!
//! - Literal mode writes the value to `peak_refresh_rate`, `min_refresh_rate`
//!   and `miui_refresh_rate` through `cmd settings put`.
//! - Indexed mode calls the compositor backdoor
//!   (`service call SurfaceFlinger 1035 i32 <idx>`). A forced switch also
//!   cycles the frame rate flexibility token (code 1036) so the compositor
//!   accepts a repeated index.
//! - Every applied value is also written to the optional notify file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, error, warn};

use super::Actuator;

const CMD_BIN: &str = "/system/bin/cmd";
const SERVICE_BIN: &str = "/system/bin/service";

const SET_ACTIVE_CONFIG: &str = "1035";
const FLEXIBILITY_TOKEN: &str = "1036";

const SETTINGS: [(&str, &str); 4] = [
    ("system", "peak_refresh_rate"),
    ("system", "min_refresh_rate"),
    ("system", "miui_refresh_rate"),
    ("secure", "miui_refresh_rate"),
];

/// Shell-backed actuator for Android devices.
#[derive(Debug, Clone)]
pub struct AndroidActuator {
    cmd: PathBuf,
    service: PathBuf,
    notify: Option<PathBuf>,
}

impl Default for AndroidActuator {
    fn default() -> Self {
        Self {
            cmd: PathBuf::from(CMD_BIN),
            service: PathBuf::from(SERVICE_BIN),
            notify: None,
        }
    }
}

impl AndroidActuator {
    /// Actuator using the stock tool locations and no notify file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes every applied value to `path` (truncating it).
    pub fn with_notify(mut self, path: impl Into<PathBuf>) -> Self {
        self.notify = Some(path.into());
        self
    }

    /// Overrides the locations of the `cmd` and `service` binaries.
    pub fn with_tools(mut self, cmd: impl Into<PathBuf>, service: impl Into<PathBuf>) -> Self {
        self.cmd = cmd.into();
        self.service = service.into();
        self
    }

    fn notify(&self, value: &str) {
        let Some(path) = &self.notify else {
            return;
        };
        if let Err(e) = fs::write(path, value) {
            warn!(path = %path.display(), error = %e, "cannot write notify file");
        }
    }

    fn settings_put(&self, namespace: &str, key: &str, value: &str) {
        run(&self.cmd, &["settings", "put", namespace, key, value]);
    }

    fn backdoor(&self, code: &str, arg: &str) {
        run(&self.service, &["call", "SurfaceFlinger", code, "i32", arg]);
    }
}

fn run(bin: &Path, args: &[&str]) {
    let status = Command::new(bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(s) if s.success() => debug!(bin = %bin.display(), ?args, "exec ok"),
        Ok(s) => warn!(bin = %bin.display(), ?args, status = %s, "exec failed"),
        Err(e) => error!(bin = %bin.display(), ?args, error = %e, "cannot exec"),
    }
}

impl Actuator for AndroidActuator {
    fn apply_literal_hz(&self, hz: &str, _forced: bool) {
        self.notify(hz);
        for (namespace, key) in SETTINGS {
            self.settings_put(namespace, key, hz);
        }
    }

    fn apply_indexed_hz(&self, idx: &str, forced: bool) {
        self.notify(idx);
        self.backdoor(SET_ACTIVE_CONFIG, idx);
        if forced {
            self.backdoor(FLEXIBILITY_TOKEN, "1");
            self.backdoor(SET_ACTIVE_CONFIG, "-1");
            self.backdoor(FLEXIBILITY_TOKEN, "0");
            self.backdoor(SET_ACTIVE_CONFIG, idx);
        }
    }

    fn name(&self) -> &str {
        "android"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::SwitchMode;

    // A fork in one test can inherit another test's script fd and fail its exec
    // with ETXTBSY; tests that spawn tools hold this lock.
    static SPAWN: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn spawn_guard() -> std::sync::MutexGuard<'static, ()> {
        SPAWN.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn missing_tools() -> AndroidActuator {
        AndroidActuator::new().with_tools("/nonexistent/cmd", "/nonexistent/service")
    }

    #[test]
    fn notify_file_receives_each_applied_value() {
        let _guard = spawn_guard();
        let path = std::env::temp_dir().join(format!("dfps-notify-{}", std::process::id()));
        let act = missing_tools().with_notify(&path);

        act.apply(SwitchMode::LiteralHz, "120", false);
        assert_eq!(fs::read_to_string(&path).unwrap(), "120");

        act.apply(SwitchMode::IndexedHz, "2", true);
        assert_eq!(fs::read_to_string(&path).unwrap(), "2");

        fs::remove_file(&path).unwrap();
    }

    /// Actuator whose `cmd` and `service` are shell scripts appending their
    /// argv to a shared log.
    #[cfg(unix)]
    fn recording_tools(tag: &str) -> (AndroidActuator, PathBuf, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("dfps-tools-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join("argv.log");
        let _ = fs::remove_file(&log);

        let mut tools = Vec::new();
        for name in ["cmd", "service"] {
            let path = dir.join(name);
            let script = format!("#!/bin/sh\necho \"{name} $*\" >> '{}'\n", log.display());
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            tools.push(path);
        }
        let act = AndroidActuator::new().with_tools(&tools[0], &tools[1]);
        (act, dir, log)
    }

    #[cfg(unix)]
    fn argv_lines(log: &Path) -> Vec<String> {
        fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn literal_mode_writes_all_refresh_rate_settings() {
        let _guard = spawn_guard();
        let (act, dir, log) = recording_tools("literal");
        act.apply(SwitchMode::LiteralHz, "120", true);

        assert_eq!(
            argv_lines(&log),
            [
                "cmd settings put system peak_refresh_rate 120",
                "cmd settings put system min_refresh_rate 120",
                "cmd settings put system miui_refresh_rate 120",
                "cmd settings put secure miui_refresh_rate 120",
            ]
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn indexed_mode_sets_active_config() {
        let _guard = spawn_guard();
        let (act, dir, log) = recording_tools("indexed");
        act.apply(SwitchMode::IndexedHz, "2", false);

        assert_eq!(argv_lines(&log), ["service call SurfaceFlinger 1035 i32 2"]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn forced_indexed_switch_cycles_flexibility_token() {
        let _guard = spawn_guard();
        let (act, dir, log) = recording_tools("forced");
        act.apply(SwitchMode::IndexedHz, "1", true);

        assert_eq!(
            argv_lines(&log),
            [
                "service call SurfaceFlinger 1035 i32 1",
                "service call SurfaceFlinger 1036 i32 1",
                "service call SurfaceFlinger 1035 i32 -1",
                "service call SurfaceFlinger 1036 i32 0",
                "service call SurfaceFlinger 1035 i32 1",
            ]
        );
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn exec_failures_are_swallowed() {
        let _guard = spawn_guard();
        let act = missing_tools().with_notify("/nonexistent/dir/notify");
        act.apply_literal_hz("60", false);
        act.apply_indexed_hz("1", true);
    }
}
