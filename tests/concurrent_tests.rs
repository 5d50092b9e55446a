//! Concurrent access tests for the session pool.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use browser_session_pool::factory::mock::MockSessionFactory;
use browser_session_pool::prelude::*;
use tokio::task::JoinSet;

fn build_pool(factory: Arc<MockSessionFactory>, size: usize) -> SessionPool {
    let config = PoolConfigBuilder::new().pool_size(size).build().unwrap();
    SessionPool::builder()
        .config(config)
        .factory(factory as Arc<dyn SessionFactory>)
        .build()
        .unwrap()
}

/// No two concurrent acquirers ever receive the same session identity:
/// 50 callers racing over a pool of 4.
#[tokio::test(flavor = "multi_thread")]
async fn test_no_session_handed_to_two_callers() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 4);

    pool.warm_up(4, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(4, Duration::from_secs(2)).await);

    // Identities currently held by some caller. An insert that reports
    // the id as already present means two callers held one session.
    let held: Arc<Mutex<HashSet<u64>>> = Arc::new(Mutex::new(HashSet::new()));
    let seen: Arc<Mutex<HashSet<u64>>> = Arc::new(Mutex::new(HashSet::new()));

    let mut callers = JoinSet::new();
    for _ in 0..50 {
        let pool = pool.clone();
        let held = Arc::clone(&held);
        let seen = Arc::clone(&seen);
        callers.spawn(async move {
            let session = pool.acquire(Duration::from_secs(5)).await.unwrap();
            let id = session.id();

            let newly_held = held.lock().unwrap().insert(id);
            assert!(newly_held, "Session {} handed to two concurrent callers", id);
            seen.lock().unwrap().insert(id);

            tokio::time::sleep(Duration::from_millis(2)).await;

            held.lock().unwrap().remove(&id);
            pool.release(session).await;
        });
    }

    while let Some(result) = callers.join_next().await {
        result.expect("caller task panicked");
    }

    assert!(held.lock().unwrap().is_empty());
    assert!(
        seen.lock().unwrap().len() <= 4,
        "Only the 4 pooled sessions should ever circulate"
    );
    assert_eq!(pool.ready_count(), 4, "All sessions returned to the queue");
    assert_eq!(factory.closed_count(), 0);
}

/// Acquirers blocked on an empty pool observe pool-closed as soon as a
/// drain begins, instead of waiting out their timeout.
#[tokio::test(flavor = "multi_thread")]
async fn test_pending_acquirers_fail_fast_on_drain() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 2);
    // No warm-up: the queue stays empty, so the acquirers block.

    let mut waiters = JoinSet::new();
    for _ in 0..4 {
        let pool = pool.clone();
        waiters.spawn(async move {
            let started = std::time::Instant::now();
            let result = pool.acquire(Duration::from_secs(30)).await;
            (result, started.elapsed())
        });
    }

    // Let the acquirers reach their wait before draining.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let report = pool.drain_and_close_all(Duration::from_secs(1)).await;
    assert_eq!(report.closed, 0);

    while let Some(result) = waiters.join_next().await {
        let (result, elapsed) = result.expect("waiter task panicked");
        assert!(
            matches!(result, Err(PoolError::PoolClosed)),
            "Pending acquirer should observe PoolClosed"
        );
        assert!(
            elapsed < Duration::from_secs(5),
            "Acquirer waited {:?} instead of failing fast",
            elapsed
        );
    }
}

/// Concurrent stats reads while sessions churn never panic or deadlock.
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_stats_access() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 3);

    pool.warm_up(3, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(3, Duration::from_secs(2)).await);

    let mut tasks = JoinSet::new();

    for _ in 0..5 {
        let pool = pool.clone();
        tasks.spawn(async move {
            for _ in 0..100 {
                let _stats = pool.stats();
                let _ready = pool.ready_count();
            }
        });
    }

    for _ in 0..5 {
        let pool = pool.clone();
        tasks.spawn(async move {
            for _ in 0..20 {
                if let Ok(session) = pool.acquire(Duration::from_millis(500)).await {
                    pool.release(session).await;
                }
            }
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert!(result.is_ok(), "Task should complete without panic");
    }

    assert_eq!(pool.ready_count(), 3);
}

/// Releases racing a drain never strand a session: every session ends
/// up closed exactly once whether the release won or lost the race.
#[tokio::test(flavor = "multi_thread")]
async fn test_release_racing_drain_never_leaks() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 4);

    pool.warm_up(4, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(4, Duration::from_secs(2)).await);

    let mut holders = JoinSet::new();
    for _ in 0..4 {
        let pool = pool.clone();
        holders.spawn(async move {
            // A holder that loses the race to the drain simply leaves
            // its session in the queue for the drain to close.
            if let Ok(session) = pool.acquire(Duration::from_millis(500)).await {
                tokio::time::sleep(Duration::from_millis(20)).await;
                pool.release(session).await;
            }
        });
    }

    // Drain while the holders are mid-flight.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let _report = pool.drain_and_close_all(Duration::from_secs(2)).await;

    while let Some(result) = holders.join_next().await {
        result.expect("holder task panicked");
    }

    // Sessions released before the drain swept the queue were closed by
    // the drain; those released after were closed by release itself.
    assert_eq!(factory.closed_count(), 4, "No session closed twice or leaked");
    assert_eq!(pool.ready_count(), 0);
}
