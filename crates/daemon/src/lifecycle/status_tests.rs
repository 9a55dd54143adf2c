// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_adapters::{CommandOutput, FakePlatform, FakeRunner};
use jitr_core::{FakeClock, Policy, QueuedWork, Registration};
use jitr_engine::{ExecutorConfig, JobExecutor, StaticConfig};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const UP_OK: &str = r#"{"outcome":"success","containerId":"c0ffee"}"#;
const AGENT_OK: &str = "Listening for Jobs\nRunning job: build\nJob build completed with result: Succeeded\n";

fn read_status(path: &Path) -> Option<DaemonStatus> {
    let text = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&text).ok()
}

#[test]
fn write_status_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");

    let mut status = DaemonStatus { is_running: true, total_failed: 3, ..DaemonStatus::default() };
    write_status(&path, &status).unwrap();
    assert_eq!(read_status(&path), Some(status.clone()));

    status.is_running = false;
    write_status(&path, &status).unwrap();
    assert_eq!(read_status(&path), Some(status));
    assert!(!dir.path().join("status.json.tmp").exists());
}

#[tokio::test]
async fn writer_tracks_daemon_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("status.json");

    let runner = FakeRunner::new();
    runner.on("devcontainer up", CommandOutput::ok(UP_OK));
    runner.on("--jitconfig", CommandOutput::ok(AGENT_OK));
    let platform = FakePlatform::new();
    platform.set_queued("acme", "widgets", vec![QueuedWork::new(42, "main", 1)]);
    let clock = FakeClock::new();
    let executor = JobExecutor::new(runner, clock.clone(), ExecutorConfig::default().work_root(dir.path().join("work")));
    let config = StaticConfig::new(
        vec![Registration::new("acme", "widgets")],
        Policy::new(Duration::from_millis(20), 1),
    );
    let daemon = Arc::new(Daemon::new(platform.clone(), executor, config, clock));

    let writer = spawn_status_writer(daemon.clone(), path.clone());
    let cancel = CancellationToken::new();
    let run = {
        let daemon = daemon.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { daemon.run(&cancel).await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if read_status(&path).is_some_and(|s| s.total_completed >= 1) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    platform.set_queued("acme", "widgets", vec![]);
    daemon.request_shutdown();
    tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap().unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !read_status(&path).is_some_and(|s| !s.is_running) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    writer.abort();

    let status = read_status(&path).unwrap();
    assert!(status.recent_jobs.iter().any(|job| job.run_id == 42 && job.status == JobStatus::Completed));
    assert!(status.active_jobs.is_empty());
}
