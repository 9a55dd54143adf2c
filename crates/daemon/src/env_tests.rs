// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear(keys: &[&str]) {
    for key in keys {
        std::env::remove_var(key);
    }
}

const STATE_KEYS: &[&str] = &["JITR_STATE_DIR", "XDG_STATE_HOME"];

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    clear(STATE_KEYS);
    std::env::set_var("JITR_STATE_DIR", "/srv/jitr");
    std::env::set_var("XDG_STATE_HOME", "/home/ci/.state");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/srv/jitr"));
    clear(STATE_KEYS);
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    clear(STATE_KEYS);
    std::env::set_var("XDG_STATE_HOME", "/home/ci/.state");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/home/ci/.state/jitr"));
    clear(STATE_KEYS);
}

#[test]
#[serial]
fn state_dir_defaults_under_home() {
    clear(STATE_KEYS);
    let home = std::env::var("HOME").unwrap_or_default();
    if home.is_empty() {
        assert!(matches!(state_dir(), Err(LifecycleError::NoStateDir)));
    } else {
        assert_eq!(state_dir().unwrap(), PathBuf::from(home).join(".local/state/jitr"));
    }
}

#[test]
#[serial]
fn config_path_override() {
    clear(&["JITR_CONFIG"]);
    assert_eq!(config_path(Path::new("/srv/jitr")), PathBuf::from("/srv/jitr/config.toml"));
    std::env::set_var("JITR_CONFIG", "/etc/jitr.toml");
    assert_eq!(config_path(Path::new("/srv/jitr")), PathBuf::from("/etc/jitr.toml"));
    clear(&["JITR_CONFIG"]);
}

#[yare::parameterized(
    github_wins = { Some("ghp_a"), Some("gho_b"), Some("ghp_a") },
    gh_fallback = { None,          Some("gho_b"), Some("gho_b") },
    blank_skip  = { Some("  "),    Some("gho_b"), Some("gho_b") },
    neither     = { None,          None,          None },
)]
#[serial]
fn token_resolution(github: Option<&str>, gh: Option<&str>, expected: Option<&str>) {
    clear(&["GITHUB_TOKEN", "GH_TOKEN"]);
    if let Some(v) = github {
        std::env::set_var("GITHUB_TOKEN", v);
    }
    if let Some(v) = gh {
        std::env::set_var("GH_TOKEN", v);
    }
    assert_eq!(github_token().as_deref(), expected);
    clear(&["GITHUB_TOKEN", "GH_TOKEN"]);
}

#[yare::parameterized(
    unset   = { None,          30_000 },
    custom  = { Some("1500"),  1_500 },
    garbage = { Some("soon"),  30_000 },
)]
#[serial]
fn drain_timeout_parsing(raw: Option<&str>, expected_ms: u64) {
    clear(&["JITR_DRAIN_TIMEOUT_MS"]);
    if let Some(v) = raw {
        std::env::set_var("JITR_DRAIN_TIMEOUT_MS", v);
    }
    assert_eq!(drain_timeout(), Duration::from_millis(expected_ms));
    clear(&["JITR_DRAIN_TIMEOUT_MS"]);
}
