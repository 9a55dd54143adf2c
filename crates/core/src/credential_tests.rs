// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn debug_redacts_encoded_config() {
    let cred = EphemeralCredential::new(7, "c2VjcmV0");
    let dbg = format!("{:?}", cred);
    assert!(dbg.contains("runner_id: 7"));
    assert!(!dbg.contains("c2VjcmV0"));
}

#[test]
fn into_encoded_config_consumes() {
    let cred = EphemeralCredential::new(7, "abc");
    assert_eq!(cred.encoded_config(), "abc");
    assert_eq!(cred.into_encoded_config(), "abc");
}
