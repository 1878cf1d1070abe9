// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

use super::*;
use serial_test::serial;
use std::path::Path;

/// Run `f` with the given variables set (or unset), restoring them after.
fn with_env(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
    let saved: Vec<(String, Option<String>)> =
        vars.iter().map(|(k, _)| (k.to_string(), std::env::var(k).ok())).collect();
    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    f();
    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }
}

#[test]
#[serial]
fn explicit_state_dir_wins() {
    with_env(
        &[("TB_STATE_DIR", Some("/tmp/tb-explicit")), ("XDG_STATE_HOME", Some("/tmp/xdg"))],
        || assert_eq!(state_dir().as_deref(), Some(Path::new("/tmp/tb-explicit"))),
    );
}

#[test]
#[serial]
fn xdg_state_home_is_next() {
    with_env(&[("TB_STATE_DIR", None), ("XDG_STATE_HOME", Some("/tmp/xdg"))], || {
        assert_eq!(state_dir().as_deref(), Some(Path::new("/tmp/xdg/tb")))
    });
}

#[test]
#[serial]
fn home_is_the_fallback() {
    with_env(&[("TB_STATE_DIR", None), ("XDG_STATE_HOME", None), ("HOME", Some("/home/tester"))], || {
        assert_eq!(state_dir().as_deref(), Some(Path::new("/home/tester/.local/state/tb")))
    });
}

#[test]
#[serial]
fn config_overrides_environment() {
    with_env(&[("TB_STATE_DIR", Some("/tmp/tb-explicit"))], || {
        let config = SessionConfig { state_dir: Some("/srv/tb".into()), ..SessionConfig::default() };
        assert_eq!(resolve_state_dir(&config).as_deref(), Some(Path::new("/srv/tb")));
        assert_eq!(
            resolve_state_dir(&SessionConfig::default()).as_deref(),
            Some(Path::new("/tmp/tb-explicit"))
        );
    });
}
