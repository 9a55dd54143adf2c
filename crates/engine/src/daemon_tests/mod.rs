// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::StaticConfig;
use crate::executor::ExecutorConfig;
use jitr_adapters::{CommandOutput, FakePlatform, FakeRunner};
use jitr_core::{FakeClock, JobStatus};
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

mod dispatch;
mod failures;
mod named;
mod shutdown;
mod startup;

const UP_OK: &str = r#"{"outcome":"success","containerId":"c0ffee"}"#;
const AGENT_OK: &str = "Listening for Jobs\nRunning job: build\nJob build completed with result: Succeeded\n";
const RUN_AGENT: &str = "--jitconfig";
const WAIT: Duration = Duration::from_secs(5);

type TestDaemon = Daemon<FakePlatform, FakeRunner, FakeClock>;

struct TestContext {
    daemon: Arc<TestDaemon>,
    platform: FakePlatform,
    runner: FakeRunner,
    cancel: CancellationToken,
    _tmp: tempfile::TempDir,
}

fn policy(max_concurrent_jobs: usize) -> Policy {
    Policy::new(Duration::from_millis(20), max_concurrent_jobs)
}

fn widgets(labels: &str) -> Registration {
    Registration::new("acme", "widgets").labels(labels)
}

fn queued(ids: &[u64]) -> Vec<QueuedWork> {
    ids.iter().map(|&id| QueuedWork::new(id, "main", id)).collect()
}

fn setup(registrations: Vec<Registration>, policy: Policy) -> TestContext {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new();
    runner.on("devcontainer up", CommandOutput::ok(UP_OK));
    runner.on(RUN_AGENT, CommandOutput::ok(AGENT_OK));
    let platform = FakePlatform::new();
    let clock = FakeClock::new();
    let executor = JobExecutor::new(
        runner.clone(),
        clock.clone(),
        ExecutorConfig::default().work_root(tmp.path().join("work")),
    );
    let daemon = Daemon::new(platform.clone(), executor, StaticConfig::new(registrations, policy), clock);
    TestContext { daemon: Arc::new(daemon), platform, runner, cancel: CancellationToken::new(), _tmp: tmp }
}

impl TestContext {
    fn start(&self) -> JoinHandle<Result<(), DaemonError>> {
        let daemon = Arc::clone(&self.daemon);
        let cancel = self.cancel.clone();
        tokio::spawn(async move { daemon.run(&cancel).await })
    }

    /// Hold every agent run until a permit is added to the returned gate.
    fn gate_agent(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.runner.on_gated(RUN_AGENT, CommandOutput::ok(AGENT_OK), gate.clone());
        gate
    }

    async fn wait_for(&self, what: &str, cond: impl Fn(&DaemonStatus) -> bool) {
        let daemon = &self.daemon;
        within(what, async {
            while !cond(&daemon.status()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
    }

    async fn stop(&self, handle: JoinHandle<Result<(), DaemonError>>) {
        self.daemon.request_shutdown();
        within("daemon stop", handle).await.unwrap().unwrap();
    }
}

async fn within<F: Future>(what: &str, fut: F) -> F::Output {
    match tokio::time::timeout(WAIT, fut).await {
        Ok(out) => out,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}

/// Next event satisfying `pred`, skipping others (and lag gaps).
async fn next_event(
    rx: &mut broadcast::Receiver<DaemonEvent>,
    pred: impl Fn(&DaemonEvent) -> bool,
) -> DaemonEvent {
    within("event", async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
}

fn completed(event: &DaemonEvent) -> bool {
    matches!(event, DaemonEvent::JobCompleted(_))
}
