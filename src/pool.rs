//! Session pool with lifecycle management.
//!
//! This module provides [`SessionPool`], the bounded pool of ready
//! browser sessions at the center of the crate.
//!
//! # Overview
//!
//! The pool provides:
//! - **Non-blocking warm-up**: [`warm_up`](SessionPool::warm_up) fans
//!   out session creation and returns immediately
//! - **Blocking consumption**: [`acquire`](SessionPool::acquire)
//!   suspends the caller until a session is ready or a timeout elapses
//! - **Single ownership**: a session is held by exactly one of {queue,
//!   caller, close path} at any instant
//! - **Failure isolation**: one failed launch or close never cancels
//!   its siblings
//! - **Coordinated teardown**:
//!   [`drain_and_close_all`](SessionPool::drain_and_close_all) fails
//!   pending acquirers fast and closes everything, collecting failures
//!
//! # Architecture
//!
//! ```text
//! SessionPool (cheaply cloneable)
//!   └─ PoolCore (shared state)
//!       ├─ ready: VecDeque<Session>      (queued, ready to use)
//!       ├─ ready_permits: Semaphore      (mirrors queue length; closed on drain)
//!       ├─ launch_gate: Semaphore        (bounds concurrent browser starts)
//!       └─ warmup_tasks: Vec<JoinHandle> (in-flight creation workers)
//! ```
//!
//! The ready queue is the single synchronization point between
//! producers (creation workers, releases) and consumers (acquirers).
//! The permit semaphore mirrors its length so acquirers can wait with a
//! timeout, and closing the semaphore is the pool-closed signal that
//! makes pending and future acquisitions fail fast.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use browser_session_pool::{
//!     ChromeSessionFactory, PoolConfigBuilder, SessionMode, SessionPool,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = SessionPool::builder()
//!         .config(PoolConfigBuilder::new().pool_size(4).build()?)
//!         .factory(Arc::new(ChromeSessionFactory::with_defaults()))
//!         .build()?;
//!
//!     // Fan out creation without blocking...
//!     pool.warm_up(4, SessionMode::Headless)?;
//!
//!     // ...and block only where a session is actually needed.
//!     let session = pool.acquire(Duration::from_secs(30)).await?;
//!     session.navigate("https://app.example.com/")?;
//!     pool.release(session).await;
//!
//!     let report = pool.drain_and_close_all(Duration::from_secs(30)).await;
//!     println!("closed {} sessions", report.closed);
//!     Ok(())
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::factory::SessionFactory;
use crate::session::{Session, SessionMode};
use crate::stats::{DrainReport, PoolStats};

// ============================================================================
// PoolCore
// ============================================================================

/// Shared state behind a [`SessionPool`].
///
/// The ready queue and the warm-up task list are the only mutable
/// shared state; both sit behind mutexes with short, I/O-free critical
/// sections. Session creation and close always run on blocking threads
/// outside any lock.
pub(crate) struct PoolCore {
    /// Configuration (immutable after creation).
    config: PoolConfig,

    /// Factory shared by all creation workers.
    factory: Arc<dyn SessionFactory>,

    /// Sessions ready for acquisition, in FIFO order.
    ready: Mutex<VecDeque<Session>>,

    /// One permit per queued session. Closed on drain so pending and
    /// future acquirers observe pool-closed instead of waiting out
    /// their timeout.
    ready_permits: Semaphore,

    /// Bounds how many browser processes launch (or close) at once.
    launch_gate: Arc<Semaphore>,

    /// Set once by the drain; checked before anything expensive.
    draining: AtomicBool,

    /// Total sessions requested via warm-up.
    target: AtomicUsize,

    /// Creations that failed; the warm-up shortfall.
    failed: AtomicUsize,

    /// Creation tasks still running.
    in_flight: AtomicUsize,

    /// Sessions currently held by callers.
    leased: AtomicUsize,

    /// Signals readiness waiters whenever the counters move.
    progress: Notify,

    /// In-flight creation workers, awaited (bounded) during drain.
    warmup_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Runtime handle captured at construction, so warm-up can spawn
    /// from sync contexts.
    runtime: tokio::runtime::Handle,
}

impl PoolCore {
    fn new(config: PoolConfig, factory: Arc<dyn SessionFactory>) -> Arc<Self> {
        log::info!(
            "Initializing session pool (size {}, launch cap {}, mode {:?})",
            config.pool_size,
            config.max_concurrent_launches,
            config.mode
        );

        // Captured here so warm_up can spawn without being async itself.
        let runtime = tokio::runtime::Handle::current();
        let launch_cap = config.max_concurrent_launches;

        Arc::new(Self {
            config,
            factory,
            ready: Mutex::new(VecDeque::new()),
            ready_permits: Semaphore::new(0),
            launch_gate: Arc::new(Semaphore::new(launch_cap)),
            draining: AtomicBool::new(false),
            target: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            leased: AtomicUsize::new(0),
            progress: Notify::new(),
            warmup_tasks: Mutex::new(Vec::new()),
            runtime,
        })
    }

    /// Queue a session for acquisition, unless the pool is draining.
    ///
    /// Returns the session back to the caller when it cannot be queued;
    /// the caller is then responsible for closing it. Draining is
    /// re-checked under the queue lock: the drain's sweep also takes
    /// that lock after setting the flag, so a session is either seen by
    /// the sweep or handed back here, never stranded.
    fn try_push_ready(&self, session: Session) -> Option<Session> {
        let mut ready = self.ready.lock().unwrap();
        if self.draining.load(Ordering::Acquire) {
            return Some(session);
        }
        ready.push_back(session);
        drop(ready);

        self.ready_permits.add_permits(1);
        self.progress.notify_waiters();
        None
    }

    fn ready_len(&self) -> usize {
        self.ready.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Close a session on a blocking thread, logging instead of
    /// propagating failures.
    async fn close_quietly(&self, session: Session) {
        let id = session.id();
        match tokio::task::spawn_blocking(move || session.close()).await {
            Ok(Ok(())) => log::debug!("Session {} closed", id),
            Ok(Err(e)) => log::warn!("{}", e),
            Err(e) => log::warn!("Close task for session {} panicked: {}", id, e),
        }
    }
}

// ============================================================================
// SessionPool
// ============================================================================

/// Bounded pool of ready browser sessions.
///
/// Cheap to clone; all clones share the same underlying pool. All
/// methods take `&self`, so a pool can be shared across tasks without
/// additional locking.
///
/// # Concurrency model
///
/// Warm-up is decoupled from use: a caller requests warm-up, proceeds
/// with other work, and blocks only at the point it actually needs a
/// session, via [`acquire`](Self::acquire) for one session or
/// [`wait_until_ready`](Self::wait_until_ready) for guaranteed
/// capacity. Creation workers fan in completed sessions as they land,
/// not in submission order.
#[derive(Clone)]
pub struct SessionPool {
    inner: Arc<PoolCore>,
}

impl SessionPool {
    /// Create a new builder for constructing a pool.
    pub fn builder() -> SessionPoolBuilder {
        SessionPoolBuilder::new()
    }

    /// Launch `n` session creation tasks and return immediately.
    ///
    /// Each task runs the factory on a blocking thread, gated so at
    /// most `max_concurrent_launches` browsers start at once. Completed
    /// sessions are queued as soon as they land; failures are logged
    /// and counted as shortfall without touching sibling tasks. A
    /// creation that completes after a drain has begun is closed
    /// immediately instead of queued.
    ///
    /// Returns the number of tasks started. Observe completion through
    /// [`wait_until_ready`](Self::wait_until_ready) or
    /// [`stats`](Self::stats).
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolClosed`] if the pool is draining.
    pub fn warm_up(&self, n: usize, mode: SessionMode) -> Result<usize> {
        if self.inner.draining.load(Ordering::Acquire) {
            return Err(PoolError::PoolClosed);
        }

        log::info!("Warm-up requested: {} sessions ({:?})", n, mode);
        self.inner.target.fetch_add(n, Ordering::AcqRel);
        self.inner.in_flight.fetch_add(n, Ordering::AcqRel);

        let mut tasks = self.inner.warmup_tasks.lock().unwrap();
        for _ in 0..n {
            let core = Arc::clone(&self.inner);
            let handle = self.inner.runtime.spawn(async move {
                let _permit = core.launch_gate.acquire().await.ok();

                // Drain began before this slot launched: skip the
                // launch entirely rather than start a browser only to
                // kill it.
                if core.draining.load(Ordering::Acquire) {
                    log::debug!("Skipping session launch, pool is draining");
                    core.in_flight.fetch_sub(1, Ordering::AcqRel);
                    core.progress.notify_waiters();
                    return;
                }

                let factory = Arc::clone(&core.factory);
                let created =
                    tokio::task::spawn_blocking(move || factory.create(mode)).await;

                match created {
                    Ok(Ok(session)) => {
                        let id = session.id();
                        if let Some(session) = core.try_push_ready(session) {
                            log::info!(
                                "Session {} completed creation during drain, closing immediately",
                                id
                            );
                            core.close_quietly(session).await;
                        } else {
                            log::info!("Session {} ready ({} queued)", id, core.ready_len());
                        }
                    }
                    Ok(Err(e)) => {
                        core.failed.fetch_add(1, Ordering::AcqRel);
                        log::warn!("Session creation failed: {}", e);
                    }
                    Err(e) => {
                        core.failed.fetch_add(1, Ordering::AcqRel);
                        log::error!("Session creation task panicked: {}", e);
                    }
                }

                core.in_flight.fetch_sub(1, Ordering::AcqRel);
                core.progress.notify_waiters();
            });
            tasks.push(handle);
        }

        Ok(n)
    }

    /// Take a ready session, waiting up to `timeout` for one to appear.
    ///
    /// Ownership of the returned session transfers to the caller, who
    /// must eventually hand it back via [`release`](Self::release) or
    /// [`discard`](Self::discard). Two concurrent acquirers can never
    /// receive the same session: permits map one-to-one to queued
    /// sessions.
    ///
    /// A zero timeout still succeeds when a session is immediately
    /// available.
    ///
    /// # Errors
    ///
    /// - [`PoolError::AcquireTimeout`] when no session became ready in
    ///   time.
    /// - [`PoolError::PoolClosed`] when the pool is draining; pending
    ///   acquirers fail fast the moment a drain begins.
    pub async fn acquire(&self, timeout: Duration) -> Result<Session> {
        if self.inner.draining.load(Ordering::Acquire) {
            return Err(PoolError::PoolClosed);
        }

        let permit =
            match tokio::time::timeout(timeout, self.inner.ready_permits.acquire()).await {
                Err(_) => return Err(PoolError::AcquireTimeout(timeout)),
                Ok(Err(_)) => return Err(PoolError::PoolClosed),
                Ok(Ok(permit)) => permit,
            };
        // The permit is consumed along with the session it mirrors.
        permit.forget();

        let session = self.inner.ready.lock().unwrap().pop_front();
        match session {
            Some(session) => {
                self.inner.leased.fetch_add(1, Ordering::AcqRel);
                log::debug!(
                    "Session {} acquired ({} still queued)",
                    session.id(),
                    self.ready_count()
                );
                Ok(session)
            }
            // A concurrent drain swept the queue between the permit
            // grant and the pop.
            None => Err(PoolError::PoolClosed),
        }
    }

    /// Return a still-usable session to the pool for reuse.
    ///
    /// The session is probed for liveness first: a dead session is
    /// closed and counted as shortfall instead of being requeued.
    /// During a drain, released sessions are closed instead of queued.
    pub async fn release(&self, session: Session) {
        self.inner.leased.fetch_sub(1, Ordering::AcqRel);
        let id = session.id();

        if !session.is_alive() {
            log::warn!(
                "Session {} failed liveness probe on release, closing instead of requeueing",
                id
            );
            self.inner.failed.fetch_add(1, Ordering::AcqRel);
            self.inner.close_quietly(session).await;
            self.inner.progress.notify_waiters();
            return;
        }

        if let Some(session) = self.inner.try_push_ready(session) {
            log::debug!("Pool draining, closing released session {}", id);
            self.inner.close_quietly(session).await;
            return;
        }

        log::debug!("Session {} released back to pool", id);
    }

    /// Close a session immediately instead of returning it to the pool.
    ///
    /// Used when a script detects the session is in a bad state. The
    /// session never reappears in the ready queue.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CloseFailed`] if the underlying close
    /// failed; the session is gone from the pool either way.
    pub async fn discard(&self, session: Session) -> Result<()> {
        self.inner.leased.fetch_sub(1, Ordering::AcqRel);
        self.inner.progress.notify_waiters();

        let id = session.id();
        log::info!("Discarding session {}", id);
        tokio::task::spawn_blocking(move || session.close())
            .await
            .unwrap_or_else(|e| {
                Err(PoolError::CloseFailed {
                    id,
                    reason: format!("close task panicked: {}", e),
                })
            })
    }

    /// Acquire a session, run `script` on it, and hand it back on every
    /// exit path: released on success, discarded on failure.
    ///
    /// This is the scoped form of the acquire/release contract for
    /// site-specific scripts.
    pub async fn with_session<T, F>(&self, timeout: Duration, script: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.acquire(timeout).await?;
        let id = session.id();

        match script(&mut session) {
            Ok(value) => {
                self.release(session).await;
                Ok(value)
            }
            Err(e) => {
                log::warn!("Script failed on session {}, discarding: {}", id, e);
                if let Err(close_err) = self.discard(session).await {
                    log::warn!("{}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Stop accepting acquisitions and close every session.
    ///
    /// The sequence:
    /// 1. Fail pending and future acquirers fast.
    /// 2. Await in-flight creation tasks up to `close_timeout`; tasks
    ///    still running after that are abandoned. Creations completing
    ///    during the drain close their session immediately.
    /// 3. Sweep the ready queue and close every session concurrently,
    ///    bounded the same way creation is.
    ///
    /// Individual close failures are collected into the report, never
    /// fatal to the drain. Idempotent: a second call returns an empty
    /// report.
    pub async fn drain_and_close_all(&self, close_timeout: Duration) -> DrainReport {
        if self.inner.draining.swap(true, Ordering::AcqRel) {
            log::debug!("Pool already drained; nothing to do");
            return DrainReport::default();
        }

        log::info!("Draining session pool (close timeout {:?})", close_timeout);

        self.inner.ready_permits.close();
        self.inner.progress.notify_waiters();

        // Let in-flight creations finish rather than aborting browser
        // launches midway, but only up to the close timeout.
        let tasks: Vec<_> = {
            let mut tasks = self.inner.warmup_tasks.lock().unwrap();
            tasks.drain(..).collect()
        };
        let deadline = tokio::time::Instant::now() + close_timeout;
        let mut abandoned = 0usize;
        for mut task in tasks {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, &mut task).await.is_err() {
                task.abort();
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            log::warn!(
                "Abandoned {} creation tasks still running after {:?}",
                abandoned,
                close_timeout
            );
        }

        let sessions: Vec<Session> = {
            let mut ready = self.inner.ready.lock().unwrap();
            ready.drain(..).collect()
        };
        log::info!("Closing {} pooled sessions", sessions.len());

        let mut closers = tokio::task::JoinSet::new();
        for session in sessions {
            let gate = Arc::clone(&self.inner.launch_gate);
            closers.spawn(async move {
                let _permit = gate.acquire().await.ok();
                let id = session.id();
                tokio::task::spawn_blocking(move || session.close())
                    .await
                    .unwrap_or_else(|e| {
                        Err(PoolError::CloseFailed {
                            id,
                            reason: format!("close task panicked: {}", e),
                        })
                    })
            });
        }

        let mut report = DrainReport::default();
        while let Some(joined) = closers.join_next().await {
            match joined {
                Ok(Ok(())) => report.closed += 1,
                Ok(Err(e)) => {
                    log::warn!("{}", e);
                    report.failures.push(e);
                }
                Err(e) => {
                    log::warn!("Close worker panicked: {}", e);
                    report.failures.push(PoolError::CloseFailed {
                        id: 0,
                        reason: e.to_string(),
                    });
                }
            }
        }

        log::info!("Drain complete: {}", report);
        report
    }

    /// Block until at least `n` sessions are ready, or `timeout`
    /// elapses, or it becomes impossible for `n` sessions to ever be
    /// ready (creation shortfall), whichever comes first.
    ///
    /// Returns `true` only in the first case. This is the guaranteed-
    /// warm entry point for callers that need capacity up front, as
    /// opposed to [`acquire`](Self::acquire)'s lazy blocking.
    pub async fn wait_until_ready(&self, n: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            // Register interest before checking, so a push between the
            // check and the wait cannot be lost.
            let progressed = self.inner.progress.notified();

            if self.ready_count() >= n {
                return true;
            }
            // ready + leased + in-flight is the most sessions that can
            // ever be queued again; below n, waiting is pointless.
            let potential = self.ready_count()
                + self.inner.leased.load(Ordering::Acquire)
                + self.inner.in_flight.load(Ordering::Acquire);
            if potential < n {
                log::debug!(
                    "wait_until_ready({}) cannot be satisfied (potential {})",
                    n,
                    potential
                );
                return false;
            }

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let _ = tokio::time::timeout(remaining, progressed).await;
        }
    }

    /// Sessions queued and ready for acquisition.
    pub fn ready_count(&self) -> usize {
        self.inner.ready_len()
    }

    /// Total sessions requested via warm-up.
    pub fn target_count(&self) -> usize {
        self.inner.target.load(Ordering::Acquire)
    }

    /// Creations that failed; the warm-up shortfall.
    pub fn failed_count(&self) -> usize {
        self.inner.failed.load(Ordering::Acquire)
    }

    /// Whether a drain has begun.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    /// Point-in-time statistics snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            ready: self.ready_count(),
            leased: self.inner.leased.load(Ordering::Acquire),
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            failed: self.failed_count(),
            target: self.target_count(),
        }
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("stats", &self.stats())
            .field("draining", &self.is_draining())
            .finish()
    }
}

// ============================================================================
// SessionPoolBuilder
// ============================================================================

/// Builder for constructing a [`SessionPool`] with validation.
///
/// # Example
///
/// ```rust,ignore
/// let pool = SessionPool::builder()
///     .config(PoolConfigBuilder::new().pool_size(8).build()?)
///     .factory(Arc::new(ChromeSessionFactory::with_defaults()))
///     .build()?;
/// ```
pub struct SessionPoolBuilder {
    config: Option<PoolConfig>,
    factory: Option<Arc<dyn SessionFactory>>,
}

impl SessionPoolBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            config: None,
            factory: None,
        }
    }

    /// Set custom configuration. Defaults to [`PoolConfig::default()`]
    /// if not called.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the session factory (required).
    pub fn factory(mut self, factory: Arc<dyn SessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Build the session pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] if no factory was provided.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime context (the runtime
    /// handle is captured here so warm-up can spawn later from sync
    /// contexts).
    pub fn build(self) -> Result<SessionPool> {
        let config = self.config.unwrap_or_default();
        let factory = self
            .factory
            .ok_or_else(|| PoolError::Configuration("No session factory provided".to_string()))?;

        Ok(SessionPool {
            inner: PoolCore::new(config, factory),
        })
    }
}

impl Default for SessionPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
