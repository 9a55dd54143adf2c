// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[tokio::test]
async fn reap_collects_only_finished_tasks() {
    let mut workers = WorkerSet::new();
    let gate = Arc::new(Semaphore::new(0));
    workers.spawn(async { 1 });
    {
        let gate = gate.clone();
        workers.spawn(async move {
            let _permit = gate.acquire().await;
            2
        });
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(workers.reap(), vec![1]);
    assert_eq!(workers.len(), 1);

    gate.add_permits(1);
    assert_eq!(workers.drain().await, vec![2]);
    assert!(workers.is_empty());
}

#[tokio::test]
async fn drain_waits_for_everything() {
    let mut workers = WorkerSet::new();
    for i in 0..3u64 {
        workers.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10 * i)).await;
            i
        });
    }
    let mut done = workers.drain().await;
    done.sort();
    assert_eq!(done, vec![0, 1, 2]);
}

#[tokio::test]
async fn panicked_task_is_dropped_from_results() {
    let mut workers: WorkerSet<u32> = WorkerSet::new();
    workers.spawn(async { panic!("boom") });
    workers.spawn(async { 7 });
    assert_eq!(workers.drain().await, vec![7]);
}
