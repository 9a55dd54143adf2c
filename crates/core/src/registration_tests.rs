// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    empty      = { "",                   &[] },
    single     = { "gpu",                &["gpu"] },
    spaced     = { " gpu , linux ",      &["gpu", "linux"] },
    duplicates = { "gpu,gpu,linux",      &["gpu", "linux"] },
    blanks     = { ",,gpu,,",            &["gpu"] },
)]
fn labels_are_normalized(raw: &str, expected: &[&str]) {
    let reg = Registration::new("acme", "widgets").labels(raw);
    assert_eq!(reg.label_list(), expected);
}

#[test]
fn runner_labels_start_with_self_hosted() {
    let reg = Registration::new("acme", "widgets").labels("gpu");
    assert_eq!(reg.runner_labels(), vec!["self-hosted", "gpu"]);
}

#[test]
fn runner_labels_do_not_repeat_self_hosted() {
    let reg = Registration::new("acme", "widgets").labels("self-hosted, arm64");
    assert_eq!(reg.runner_labels(), vec!["self-hosted", "arm64"]);
}

#[test]
fn slug_joins_owner_and_repository() {
    assert_eq!(Registration::new("acme", "widgets").slug(), "acme/widgets");
}

#[test]
fn blank_container_name_is_not_a_reuse_name() {
    let reg = Registration::new("acme", "widgets").container_name("  ");
    assert_eq!(reg.reuse_name(), None);
    let reg = Registration::new("acme", "widgets").container_name("build-box");
    assert_eq!(reg.reuse_name(), Some("build-box"));
}

#[test]
fn deserializes_with_defaults() {
    let reg: Registration =
        serde_json::from_str(r#"{"owner":"acme","repository":"widgets"}"#).unwrap();
    assert!(reg.enabled);
    assert_eq!(reg.labels, "");
    assert_eq!(reg.container_name, None);
}
