//! Integration tests for the session pool and lifecycle manager.
//!
//! All tests run against the in-memory mock factory, so no browser is
//! required.

use std::sync::Arc;
use std::time::Duration;

use browser_session_pool::factory::mock::MockSessionFactory;
use browser_session_pool::prelude::*;

/// Poll until every requested creation has settled (succeeded or
/// failed).
async fn wait_settled(pool: &SessionPool) {
    for _ in 0..500 {
        if pool.stats().is_settled() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pool never settled: {}", pool.stats());
}

fn build_pool(factory: Arc<MockSessionFactory>, size: usize) -> SessionPool {
    let config = PoolConfigBuilder::new().pool_size(size).build().unwrap();
    SessionPool::builder()
        .config(config)
        .factory(factory as Arc<dyn SessionFactory>)
        .build()
        .unwrap()
}

/// For all N, warm_up(N) followed by waiting for completion results in
/// ready + failed == N.
#[tokio::test]
async fn test_warmup_accounting() {
    let factory = Arc::new(MockSessionFactory::fail_after_n(3, "launch budget spent"));
    let pool = build_pool(Arc::clone(&factory), 5);

    let started = pool.warm_up(5, SessionMode::Headless).unwrap();
    assert_eq!(started, 5);

    wait_settled(&pool).await;

    assert_eq!(pool.ready_count(), 3);
    assert_eq!(pool.failed_count(), 2);
    assert_eq!(pool.ready_count() + pool.failed_count(), pool.target_count());
}

/// Pool of 4 with one deliberate creation failure: warm-up reports
/// ready=3 / failed=1, waiting for 4 fails, waiting for 3 succeeds.
#[tokio::test]
async fn test_partial_warmup_shortfall() {
    let factory = Arc::new(MockSessionFactory::fail_after_n(3, "one bad slot"));
    let pool = build_pool(Arc::clone(&factory), 4);

    pool.warm_up(4, SessionMode::Headless).unwrap();

    assert!(
        !pool.wait_until_ready(4, Duration::from_secs(2)).await,
        "4 sessions can never be ready when one creation failed"
    );
    assert!(
        pool.wait_until_ready(3, Duration::from_secs(2)).await,
        "3 sessions should become ready"
    );

    wait_settled(&pool).await;
    assert_eq!(pool.ready_count(), 3);
    assert_eq!(pool.failed_count(), 1);
}

/// release followed by acquire can return the same session (reuse is
/// observable).
#[tokio::test]
async fn test_release_then_acquire_reuses_session() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);

    let first = pool.acquire(Duration::from_secs(1)).await.unwrap();
    let first_id = first.id();
    pool.release(first).await;

    let second = pool.acquire(Duration::from_secs(1)).await.unwrap();
    assert_eq!(second.id(), first_id, "Released session should be reused");
    pool.release(second).await;
}

/// Discarded sessions never reappear in the ready queue.
#[tokio::test]
async fn test_discard_removes_session() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);

    let session = pool.acquire(Duration::from_secs(1)).await.unwrap();
    pool.discard(session).await.unwrap();

    assert_eq!(pool.ready_count(), 0);
    assert_eq!(factory.closed_count(), 1, "Discard closes the session");

    // The slot is gone; a short acquire times out rather than returning
    // a stale handle.
    match pool.acquire(Duration::from_millis(50)).await {
        Err(PoolError::AcquireTimeout(_)) => {}
        other => panic!("Expected AcquireTimeout, got {:?}", other.map(|s| s.id())),
    }
}

/// acquire with a zero timeout on an empty, fully-in-flight pool
/// returns Timeout instead of deadlocking.
#[tokio::test]
async fn test_zero_timeout_acquire_on_in_flight_pool() {
    let factory = Arc::new(
        MockSessionFactory::new().with_create_delay(Duration::from_millis(200)),
    );
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();

    match pool.acquire(Duration::ZERO).await {
        Err(PoolError::AcquireTimeout(_)) => {}
        other => panic!("Expected AcquireTimeout, got {:?}", other.map(|s| s.id())),
    }

    // The in-flight creation still lands.
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);
}

/// A zero timeout still succeeds when a session is already queued.
#[tokio::test]
async fn test_zero_timeout_acquire_on_warm_pool() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);

    let session = pool.acquire(Duration::ZERO).await.unwrap();
    pool.release(session).await;
}

/// After drain_and_close_all, every previously-ready session is closed
/// exactly once and subsequent acquires fail fast.
#[tokio::test]
async fn test_drain_closes_everything_once() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 3);

    pool.warm_up(3, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(3, Duration::from_secs(2)).await);

    let report = pool.drain_and_close_all(Duration::from_secs(2)).await;
    assert_eq!(report.closed, 3);
    assert!(report.is_clean());
    assert_eq!(factory.closed_count(), 3, "Each session closed exactly once");
    assert_eq!(pool.ready_count(), 0);

    // Fail fast, not a timeout wait.
    let started = std::time::Instant::now();
    match pool.acquire(Duration::from_secs(10)).await {
        Err(PoolError::PoolClosed) => {}
        other => panic!("Expected PoolClosed, got {:?}", other.map(|s| s.id())),
    }
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "Acquire after drain must not wait out its timeout"
    );

    // Drain is idempotent; warm-up is refused.
    let second = pool.drain_and_close_all(Duration::from_secs(2)).await;
    assert_eq!(second.closed, 0);
    assert!(matches!(
        pool.warm_up(1, SessionMode::Headless),
        Err(PoolError::PoolClosed)
    ));
    assert_eq!(factory.closed_count(), 3, "No double close from second drain");
}

/// Individual close failures are collected into the report, never fatal
/// to the drain.
#[tokio::test]
async fn test_drain_collects_close_failures() {
    let factory = Arc::new(MockSessionFactory::new().with_failing_close());
    let pool = build_pool(Arc::clone(&factory), 2);

    pool.warm_up(2, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(2, Duration::from_secs(2)).await);

    let report = pool.drain_and_close_all(Duration::from_secs(2)).await;
    assert_eq!(report.closed, 0);
    assert_eq!(report.failed(), 2);
    for failure in &report.failures {
        assert!(matches!(failure, PoolError::CloseFailed { .. }));
    }
}

/// A session that fails its liveness probe on release is closed, not
/// requeued.
#[tokio::test]
async fn test_release_of_dead_session_closes_it() {
    let factory = Arc::new(MockSessionFactory::new().with_dead_sessions());
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);

    let session = pool.acquire(Duration::from_secs(1)).await.unwrap();
    pool.release(session).await;

    assert_eq!(pool.ready_count(), 0, "Dead session must not be requeued");
    assert_eq!(factory.closed_count(), 1);
}

/// with_session releases on success and discards on script failure.
#[tokio::test]
async fn test_with_session_contract() {
    let factory = Arc::new(MockSessionFactory::new());
    let pool = build_pool(Arc::clone(&factory), 1);

    pool.warm_up(1, SessionMode::Headless).unwrap();
    assert!(pool.wait_until_ready(1, Duration::from_secs(2)).await);

    // Success: session goes back to the queue.
    let source = pool
        .with_session(Duration::from_secs(1), |session| {
            session.navigate("https://app.example.com/")?;
            session.page_source()
        })
        .await
        .unwrap();
    assert!(source.contains("app.example.com"));
    assert_eq!(pool.ready_count(), 1);
    assert_eq!(factory.closed_count(), 0);

    // Failure: session is discarded.
    let result: Result<()> = pool
        .with_session(Duration::from_secs(1), |_session| {
            Err(PoolError::Driver("page in a bad state".to_string()))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(pool.ready_count(), 0);
    assert_eq!(factory.closed_count(), 1);
}

// ============================================================================
// Lifecycle manager
// ============================================================================

fn temp_auth_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("session-pool-{}", uuid::Uuid::new_v4()))
        .join("cookie.json")
}

fn lifecycle_config(auth_path: &std::path::Path, size: usize) -> PoolConfig {
    PoolConfigBuilder::new()
        .pool_size(size)
        .auth_state_path(auth_path)
        .target_url("https://app.example.com/")
        .close_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

/// With a persisted auth state, start loads it and never runs the
/// interactive capture.
#[tokio::test]
async fn test_lifecycle_start_with_existing_auth() {
    let auth_path = temp_auth_path();
    let saved = AuthState::new(vec![serde_json::json!({
        "name": "sid", "value": "abc", "domain": ".example.com",
    })]);
    AuthStateStore::new(&auth_path).save(&saved).unwrap();

    let factory = Arc::new(MockSessionFactory::new());
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 4), Arc::clone(&factory) as _)
            .unwrap();
    assert_eq!(manager.state(), LifecycleState::Uninitialized);

    manager
        .start_with_gate(|| {
            Err(std::io::Error::other(
                "gate must not run when auth state exists",
            ))
        })
        .await
        .unwrap();

    assert_eq!(manager.state(), LifecycleState::Ready);
    assert_eq!(manager.auth_state(), Some(&saved));

    let ready = manager.await_capacity(Duration::from_secs(2)).await.unwrap();
    assert_eq!(ready, 4);

    let report = manager.shutdown().await;
    assert_eq!(report.closed, 4);
    assert_eq!(manager.state(), LifecycleState::Closed);

    // Terminal state is idempotent.
    let again = manager.shutdown().await;
    assert_eq!(again.closed, 0);
    assert_eq!(manager.state(), LifecycleState::Closed);
}

/// With no auth state, start runs the capture, persists the blob, and
/// closes the capture session.
#[tokio::test]
async fn test_lifecycle_capture_on_missing_auth() {
    let auth_path = temp_auth_path();
    let factory = Arc::new(MockSessionFactory::new());
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 2), Arc::clone(&factory) as _)
            .unwrap();

    manager.start_with_gate(|| Ok(())).await.unwrap();

    assert_eq!(manager.state(), LifecycleState::Ready);
    let store = AuthStateStore::new(&auth_path);
    assert!(store.exists(), "Capture must persist the blob");
    assert_eq!(store.load().unwrap(), manager.auth_state().cloned().unwrap());
    assert_eq!(
        factory.closed_count(),
        1,
        "The capture session is closed after capture"
    );

    manager.shutdown().await;
}

/// A corrupt auth blob triggers re-capture instead of being silently
/// used.
#[tokio::test]
async fn test_lifecycle_recaptures_corrupt_auth() {
    let auth_path = temp_auth_path();
    std::fs::create_dir_all(auth_path.parent().unwrap()).unwrap();
    std::fs::write(&auth_path, "definitely not json").unwrap();

    let factory = Arc::new(MockSessionFactory::new());
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 1), Arc::clone(&factory) as _)
            .unwrap();

    manager.start_with_gate(|| Ok(())).await.unwrap();

    assert_eq!(manager.state(), LifecycleState::Ready);
    // The blob was rewritten and now parses.
    AuthStateStore::new(&auth_path).load().unwrap();

    manager.shutdown().await;
}

/// An aborted capture surfaces to the caller, and the capture session
/// is still closed.
#[tokio::test]
async fn test_lifecycle_capture_aborted() {
    let auth_path = temp_auth_path();
    let factory = Arc::new(MockSessionFactory::new());
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 1), Arc::clone(&factory) as _)
            .unwrap();

    let result = manager
        .start_with_gate(|| Err(std::io::Error::other("operator walked away")))
        .await;

    match result {
        Err(PoolError::CaptureAborted(msg)) => assert!(msg.contains("operator walked away")),
        other => panic!("Expected CaptureAborted, got {:?}", other),
    }
    assert_ne!(manager.state(), LifecycleState::Ready);
    assert_eq!(
        factory.closed_count(),
        1,
        "Capture session closed on the abort path too"
    );
    assert!(!AuthStateStore::new(&auth_path).exists());
}

/// A fully failed warm-up surfaces as a hard failure from
/// await_capacity.
#[tokio::test]
async fn test_lifecycle_total_warmup_failure() {
    let auth_path = temp_auth_path();
    AuthStateStore::new(&auth_path)
        .save(&AuthState::default())
        .unwrap();

    let factory = Arc::new(MockSessionFactory::always_fails("no browser anywhere"));
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 3), Arc::clone(&factory) as _)
            .unwrap();

    manager.start_with_gate(|| Ok(())).await.unwrap();

    match manager.await_capacity(Duration::from_secs(2)).await {
        Err(PoolError::CreationFailed(msg)) => {
            assert!(msg.contains("requested 3"), "got: {}", msg);
        }
        other => panic!("Expected CreationFailed, got {:?}", other),
    }

    manager.shutdown().await;
}

/// Starting twice is a state error, not a silent restart.
#[tokio::test]
async fn test_lifecycle_double_start_rejected() {
    let auth_path = temp_auth_path();
    AuthStateStore::new(&auth_path)
        .save(&AuthState::default())
        .unwrap();

    let factory = Arc::new(MockSessionFactory::new());
    let mut manager =
        PoolLifecycleManager::new(lifecycle_config(&auth_path, 1), Arc::clone(&factory) as _)
            .unwrap();

    manager.start_with_gate(|| Ok(())).await.unwrap();
    let result = manager.start_with_gate(|| Ok(())).await;
    assert!(matches!(result, Err(PoolError::Configuration(_))));

    manager.shutdown().await;
}
