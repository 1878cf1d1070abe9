// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Testbench Developers

//! Centralized environment variable access for the storage crate.

use std::path::PathBuf;
use tb_core::SessionConfig;

/// Resolve state directory: TB_STATE_DIR > XDG_STATE_HOME/tb > ~/.local/state/tb
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("TB_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("tb"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/tb"))
}

/// State directory from `config`, falling back to the environment.
pub fn resolve_state_dir(config: &SessionConfig) -> Option<PathBuf> {
    config.state_dir.clone().or_else(state_dir)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
