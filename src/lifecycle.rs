//! Top-level pool lifecycle orchestration.
//!
//! This module provides [`PoolLifecycleManager`], which ties the auth
//! store and the session pool together behind a small state machine:
//!
//! ```text
//! Uninitialized → AuthResolving → WarmingUp → Ready → Draining → Closed
//! ```
//!
//! On start the manager resolves the authentication state (loading the
//! persisted blob, or running the one-time interactive capture when the
//! blob is absent or corrupt), then requests pool warm-up and returns
//! without waiting; `Ready` means warm-up has been *requested*, and
//! callers that need guaranteed capacity use
//! [`wait_until_ready`](PoolLifecycleManager::wait_until_ready) or
//! [`await_capacity`](PoolLifecycleManager::await_capacity) themselves.
//! On shutdown it drains the pool, tolerating individual close
//! failures, and becomes `Closed`; a second shutdown is a no-op.

use std::sync::Arc;
use std::time::Duration;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::factory::SessionFactory;
use crate::pool::SessionPool;
use crate::stats::DrainReport;
use crate::store::{AuthState, AuthStateStore, console_ack_gate};

/// Lifecycle phases of the managed pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, nothing started yet.
    Uninitialized,
    /// Resolving the persisted auth state (possibly interactively).
    AuthResolving,
    /// Warm-up is being requested.
    WarmingUp,
    /// Warm-up has been requested; the pool fills in the background.
    Ready,
    /// Shutdown in progress.
    Draining,
    /// Drained; terminal and idempotent.
    Closed,
}

/// Orchestrates auth resolution, pool warm-up, and teardown.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use browser_session_pool::{
///     ChromeSessionFactory, PoolConfigBuilder, PoolLifecycleManager,
/// };
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PoolConfigBuilder::new()
///         .pool_size(4)
///         .target_url("https://app.example.com/")
///         .build()?;
///
///     let mut manager = PoolLifecycleManager::new(
///         config,
///         Arc::new(ChromeSessionFactory::with_defaults()),
///     )?;
///
///     // Resolves auth (interactive capture on first run), requests
///     // warm-up, returns without blocking on browser launches.
///     manager.start().await?;
///
///     // Block only if guaranteed capacity is needed up front.
///     manager.await_capacity(Duration::from_secs(60)).await?;
///
///     // ... acquire sessions from manager.pool() and run scripts ...
///
///     let report = manager.shutdown().await;
///     println!("closed {} sessions", report.closed);
///     Ok(())
/// }
/// ```
pub struct PoolLifecycleManager {
    config: PoolConfig,
    factory: Arc<dyn SessionFactory>,
    pool: SessionPool,
    store: AuthStateStore,
    auth: Option<AuthState>,
    state: LifecycleState,
}

impl PoolLifecycleManager {
    /// Create a manager over a fresh pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] if the pool cannot be
    /// built.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime context (the pool
    /// captures the runtime handle at construction).
    pub fn new(config: PoolConfig, factory: Arc<dyn SessionFactory>) -> Result<Self> {
        let store = AuthStateStore::new(config.auth_state_path.clone());
        let pool = SessionPool::builder()
            .config(config.clone())
            .factory(Arc::clone(&factory))
            .build()?;

        Ok(Self {
            config,
            factory,
            pool,
            store,
            auth: None,
            state: LifecycleState::Uninitialized,
        })
    }

    /// Start the lifecycle with the console acknowledgment gate.
    ///
    /// Equivalent to
    /// [`start_with_gate(console_ack_gate())`](Self::start_with_gate).
    pub async fn start(&mut self) -> Result<()> {
        self.start_with_gate(console_ack_gate()).await
    }

    /// Start the lifecycle: resolve auth state, then request warm-up.
    ///
    /// `ack` is the human-acknowledgment gate used if interactive
    /// capture turns out to be necessary; it blocks with no timeout by
    /// design and runs on a blocking thread.
    ///
    /// Returns once warm-up has been *requested*; session creation
    /// continues in the background.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Configuration`] when called from any state other
    ///   than `Uninitialized`, or when capture is needed but no
    ///   `target_url` is configured.
    /// - [`PoolError::CaptureAborted`] and capture/persistence errors
    ///   from the auth resolution path.
    pub async fn start_with_gate<F>(&mut self, ack: F) -> Result<()>
    where
        F: FnOnce() -> std::io::Result<()> + Send + 'static,
    {
        if self.state != LifecycleState::Uninitialized {
            return Err(PoolError::Configuration(format!(
                "start called in state {:?}",
                self.state
            )));
        }

        self.state = LifecycleState::AuthResolving;
        log::info!("Lifecycle: resolving auth state");
        let auth = self.resolve_auth(ack).await?;
        self.auth = Some(auth);

        self.state = LifecycleState::WarmingUp;
        log::info!(
            "Lifecycle: requesting warm-up of {} sessions",
            self.config.pool_size
        );
        self.pool.warm_up(self.config.pool_size, self.config.mode)?;

        // "Ready" is a logical transition: warm-up has been requested,
        // not completed. Callers needing capacity block themselves.
        self.state = LifecycleState::Ready;
        Ok(())
    }

    /// Load the persisted auth state, or capture it interactively when
    /// absent. A corrupt blob is logged and treated as absent, never
    /// silently ignored.
    async fn resolve_auth<F>(&self, ack: F) -> Result<AuthState>
    where
        F: FnOnce() -> std::io::Result<()> + Send + 'static,
    {
        if self.store.exists() {
            match self.store.load() {
                Ok(state) => return Ok(state),
                Err(PoolError::AuthStateCorrupt(reason)) => {
                    log::warn!("Persisted auth state is corrupt ({}); re-capturing", reason);
                }
                Err(e) => return Err(e),
            }
        } else {
            log::info!(
                "No auth state at {}; interactive capture required",
                self.store.path().display()
            );
        }

        let target_url = self.config.target_url.clone().ok_or_else(|| {
            PoolError::Configuration(
                "target_url is required for interactive auth capture".to_string(),
            )
        })?;

        // The capture blocks on a human; keep it off the async workers.
        let store = self.store.clone();
        let factory = Arc::clone(&self.factory);
        let state = tokio::task::spawn_blocking(move || {
            store.capture_interactive(factory.as_ref(), &target_url, ack)
        })
        .await
        .map_err(|e| PoolError::CaptureAborted(format!("capture task panicked: {}", e)))??;

        self.store.save(&state)?;
        Ok(state)
    }

    /// Block until warm-up settles, then report usable capacity.
    ///
    /// A warm-up shortfall is logged as counts ("requested N, ready M")
    /// and is not an error. Only a fully failed warm-up (zero sessions
    /// ever became ready) is surfaced as a hard failure.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CreationFailed`] when no session became
    /// ready within `timeout`.
    pub async fn await_capacity(&self, timeout: Duration) -> Result<usize> {
        let target = self.pool.target_count();
        if self.pool.wait_until_ready(target, timeout).await {
            log::info!("Pool warm: {} of {} sessions ready", target, target);
            return Ok(target);
        }

        let stats = self.pool.stats();
        if stats.ready == 0 && stats.leased == 0 {
            return Err(PoolError::CreationFailed(format!(
                "warm-up produced no usable sessions (requested {}, failed {})",
                target, stats.failed
            )));
        }

        log::warn!(
            "Warm-up shortfall: requested {}, ready {} (failed {})",
            target,
            stats.ready,
            stats.failed
        );
        Ok(stats.ready)
    }

    /// Shut the pool down: drain, close everything, become `Closed`.
    ///
    /// The manager is `Closed` once the report exists, irrespective of
    /// partial failures recorded in it. Idempotent: calling shutdown on
    /// a closed manager returns an empty report.
    pub async fn shutdown(&mut self) -> DrainReport {
        if self.state == LifecycleState::Closed {
            log::debug!("Shutdown called on closed manager; no-op");
            return DrainReport::default();
        }

        self.state = LifecycleState::Draining;
        log::info!("Lifecycle: draining pool");
        let report = self.pool.drain_and_close_all(self.config.close_timeout).await;

        self.state = LifecycleState::Closed;
        log::info!("Lifecycle: closed ({})", report);
        report
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The managed pool, for acquiring sessions.
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// The resolved auth state, available after a successful start.
    ///
    /// The pool never applies it on its own; scripts pull it from here
    /// and call [`Session::apply_auth`](crate::Session::apply_auth)
    /// when they want an authenticated session. No expiry or validity
    /// check is performed: a stale state is used until the persisted
    /// file is deleted.
    pub fn auth_state(&self) -> Option<&AuthState> {
        self.auth.as_ref()
    }

    /// Delegate of [`SessionPool::wait_until_ready`].
    pub async fn wait_until_ready(&self, n: usize, timeout: Duration) -> bool {
        self.pool.wait_until_ready(n, timeout).await
    }
}

impl std::fmt::Debug for PoolLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolLifecycleManager")
            .field("state", &self.state)
            .field("pool", &self.pool)
            .field("auth_records", &self.auth.as_ref().map(|a| a.len()))
            .finish()
    }
}
