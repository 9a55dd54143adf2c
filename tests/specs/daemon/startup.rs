// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup validation: every failure here happens before the daemon takes
//! its lock or touches a container engine.

use crate::prelude::*;

const WIDGETS: &str = r#"
[[registration]]
owner = "acme"
repository = "widgets"
"#;

#[test]
fn no_enabled_registrations_is_a_configuration_error() {
    let project = Project::with_config(
        r#"
[policy]
max_concurrent_jobs = 2

[[registration]]
owner = "acme"
repository = "widgets"
enabled = false
"#,
    );
    project
        .jitrd()
        .token("ghp_spec")
        .fails()
        .stderr_has("configuration error")
        .stderr_has("no enabled registrations");
    assert!(!project.state_dir().join("daemon.pid").exists());
}

#[test]
fn empty_config_has_no_registrations() {
    let project = Project::with_config("");
    project.jitrd().token("ghp_spec").fails().stderr_has("no enabled registrations");
}

#[test]
fn missing_token_is_a_configuration_error() {
    let project = Project::with_config(WIDGETS);
    project.jitrd().fails().stderr_has("no platform token");
}

#[test]
fn zero_concurrency_is_rejected() {
    let project = Project::with_config(&format!("[policy]\nmax_concurrent_jobs = 0\n{WIDGETS}"));
    project.jitrd().token("ghp_spec").fails().stderr_has("max_concurrent_jobs");
}

#[test]
fn zero_poll_interval_is_rejected() {
    let project = Project::with_config(&format!("[policy]\npoll_interval_secs = 0\n{WIDGETS}"));
    project.jitrd().token("ghp_spec").fails().stderr_has("poll_interval");
}

#[test]
fn missing_config_file_names_the_path() {
    let project = Project::empty();
    project.jitrd().token("ghp_spec").fails().stderr_has("failed to read").stderr_has("config.toml");
}

#[test]
fn malformed_config_is_reported() {
    let project = Project::with_config("[policy]\nmax_concurrent_jobs = \"lots\"\n");
    project.jitrd().token("ghp_spec").fails().stderr_has("invalid config");
}
