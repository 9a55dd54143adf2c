// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use jitr_core::FakeClock;
use std::time::Duration;

fn entry(name: &str, id: &str) -> NamedContainerEntry {
    NamedContainerEntry::new(name, id, "acme", "widgets", 1_000)
}

fn pool() -> (NamedContainerPool<FakeClock>, FakeClock) {
    let clock = FakeClock::at(5_000);
    (NamedContainerPool::new(clock.clone()), clock)
}

#[test]
fn register_get_and_remove() {
    let (pool, _) = pool();
    assert!(pool.try_get("gpu-box").is_none());

    pool.register(entry("gpu-box", "c1"));
    assert_eq!(pool.try_get("gpu-box").unwrap().container_id, "c1");

    pool.register(entry("gpu-box", "c2"));
    assert_eq!(pool.try_get("gpu-box").unwrap().container_id, "c2");

    assert_eq!(pool.remove("gpu-box").unwrap().container_id, "c2");
    assert!(pool.try_get("gpu-box").is_none());
    assert!(pool.remove("gpu-box").is_none());
}

#[test]
fn get_all_is_sorted_by_name() {
    let (pool, _) = pool();
    pool.register(entry("zeta", "c3"));
    pool.register(entry("alpha", "c1"));
    pool.register(entry("mid", "c2"));
    let names: Vec<_> = pool.get_all().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[tokio::test]
async fn lease_marks_in_use_until_dropped() {
    let (pool, clock) = pool();
    pool.register(entry("gpu-box", "c1"));

    let lease = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();
    assert_eq!(lease.name(), "gpu-box");
    assert!(pool.try_get("gpu-box").unwrap().in_use);

    clock.advance(Duration::from_secs(3));
    drop(lease);
    let released = pool.try_get("gpu-box").unwrap();
    assert!(!released.in_use);
    assert_eq!(released.last_used_at_ms, 8_000);
}

#[tokio::test]
async fn acquire_without_entry_then_register() {
    let (pool, _) = pool();
    let lease = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();
    assert!(lease.entry().is_none());

    lease.register(entry("ignored", "fresh"));
    let held = pool.try_get("gpu-box").unwrap();
    assert_eq!(held.container_id, "fresh");
    assert!(held.in_use);

    drop(lease);
    assert!(!pool.try_get("gpu-box").unwrap().in_use);
}

#[tokio::test]
async fn same_name_is_serialized() {
    let (pool, _) = pool();
    pool.register(entry("gpu-box", "c1"));
    let first = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();

    let waiter = {
        let pool = pool.clone();
        tokio::spawn(async move {
            let lease = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();
            lease.entry().unwrap().in_use
        })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!waiter.is_finished());

    drop(first);
    assert!(tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap());
}

#[tokio::test]
async fn different_names_do_not_contend() {
    let (pool, _) = pool();
    let _gpu = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();
    let arm = tokio::time::timeout(
        Duration::from_millis(200),
        pool.acquire("arm-box", &CancellationToken::new()),
    )
    .await;
    assert!(arm.unwrap().is_ok());
}

#[tokio::test]
async fn cancelled_wait_gives_up() {
    let (pool, _) = pool();
    let _held = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let err = pool.acquire("gpu-box", &cancel).await.err().unwrap();
    assert!(matches!(err, PoolError::Cancelled(name) if name == "gpu-box"));
}

#[tokio::test]
async fn evicted_entry_is_not_resurrected_on_release() {
    let (pool, _) = pool();
    pool.register(entry("gpu-box", "c1"));
    let lease = pool.acquire("gpu-box", &CancellationToken::new()).await.unwrap();
    assert_eq!(lease.evict().unwrap().container_id, "c1");
    drop(lease);
    assert!(pool.try_get("gpu-box").is_none());
}
