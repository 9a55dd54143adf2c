// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_core::Policy;

struct BrokenConfig;

impl ConfigSource for BrokenConfig {
    fn load_registrations(&self) -> Result<Vec<Registration>, ConfigError> {
        Err(ConfigError::Invalid("registration 1 is missing `owner`".to_string()))
    }

    fn load_policy(&self) -> Result<Policy, ConfigError> {
        Ok(Policy::default())
    }
}

fn assert_configuration_error(result: Result<(), DaemonError>, expected: &str) {
    match result {
        Err(DaemonError::Configuration(message)) => assert!(message.contains(expected), "{message}"),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_credential_fails_fast() {
    let ctx = setup(vec![widgets("")], policy(1));
    ctx.platform.set_authenticated(false);
    assert_configuration_error(ctx.daemon.run(&ctx.cancel).await, "token");
    assert!(ctx.platform.polls().is_empty());
    assert!(!ctx.daemon.status().is_running);
}

#[tokio::test]
async fn no_registrations_fails_fast() {
    let ctx = setup(vec![], policy(1));
    assert_configuration_error(ctx.daemon.run(&ctx.cancel).await, "no enabled registrations");
}

#[tokio::test]
async fn only_disabled_registrations_fails_fast() {
    let ctx = setup(vec![widgets("").enabled(false)], policy(1));
    assert_configuration_error(ctx.daemon.run(&ctx.cancel).await, "no enabled registrations");
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let ctx = setup(vec![widgets("")], policy(0));
    assert_configuration_error(ctx.daemon.run(&ctx.cancel).await, "max_concurrent_jobs");
}

#[tokio::test]
async fn zero_poll_interval_is_rejected() {
    let ctx = setup(vec![widgets("")], Policy::new(Duration::ZERO, 1));
    assert_configuration_error(ctx.daemon.preflight(), "poll_interval");
    assert_configuration_error(ctx.daemon.run(&ctx.cancel).await, "poll_interval");
    assert!(ctx.platform.polls().is_empty());
}

#[tokio::test]
async fn config_load_error_is_propagated() {
    let runner = FakeRunner::new();
    let clock = FakeClock::new();
    let executor = JobExecutor::new(runner, clock.clone(), ExecutorConfig::default());
    let daemon = Daemon::new(FakePlatform::new(), executor, BrokenConfig, clock);

    let err = daemon.run(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, DaemonError::Config(ConfigError::Invalid(_))));
    assert!(err.to_string().contains("missing `owner`"));
}

#[tokio::test]
async fn already_cancelled_daemon_returns_after_startup() {
    let ctx = setup(vec![widgets("")], policy(1));
    ctx.cancel.cancel();
    within("run", ctx.daemon.run(&ctx.cancel)).await.unwrap();
    assert!(ctx.platform.polls().is_empty());
}

#[tokio::test]
async fn preflight_checks_without_starting() {
    let ctx = setup(vec![widgets("").enabled(false)], policy(1));
    assert_configuration_error(ctx.daemon.preflight(), "no enabled registrations");

    let ctx = setup(vec![widgets("")], policy(1));
    ctx.daemon.preflight().unwrap();
    assert!(ctx.platform.polls().is_empty());
    assert!(!ctx.daemon.status().is_running);
}
