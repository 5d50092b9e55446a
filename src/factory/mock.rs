//! Mock session factory for testing.
//!
//! Provides [`MockSessionFactory`], a [`SessionFactory`] that produces
//! fully in-memory sessions, so pool behavior (queue handoff, timeouts,
//! drain accounting) can be exercised without a browser installed.
//!
//! # Feature Flag
//!
//! Only available when the `test-utils` feature is enabled, or during
//! testing (`#[cfg(test)]`).
//!
//! # Example
//!
//! ```rust,ignore
//! use browser_session_pool::factory::mock::MockSessionFactory;
//!
//! // Every creation succeeds with an in-memory driver
//! let factory = MockSessionFactory::new();
//!
//! // Fail every creation
//! let factory = MockSessionFactory::always_fails("no browser here");
//!
//! // Succeed three times, then fail
//! let factory = MockSessionFactory::fail_after_n(3, "resources exhausted");
//! ```

use std::any::Any;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::SessionFactory;
use crate::error::{PoolError, Result};
use crate::session::{Session, SessionMode};
use crate::store::AuthState;
use crate::traits::Driver;

/// In-memory driver backing mock sessions.
///
/// Records navigations and imported auth state; close bumps the shared
/// close counter so tests can assert every session closed exactly once.
pub struct MockDriver {
    visited: Mutex<Vec<String>>,
    applied_auth: Mutex<Option<AuthState>>,
    alive: bool,
    fail_close: bool,
    closed: Arc<AtomicUsize>,
}

impl MockDriver {
    /// URLs navigated so far.
    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    /// The last auth state imported into this driver, if any.
    pub fn applied_auth(&self) -> Option<AuthState> {
        self.applied_auth.lock().unwrap().clone()
    }
}

impl Driver for MockDriver {
    fn navigate(&self, url: &str) -> Result<()> {
        self.visited.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn page_source(&self) -> Result<String> {
        let visited = self.visited.lock().unwrap();
        Ok(format!(
            "<html><body>{}</body></html>",
            visited.last().map(String::as_str).unwrap_or("")
        ))
    }

    fn export_auth(&self) -> Result<AuthState> {
        Ok(AuthState::new(vec![serde_json::json!({
            "name": "mock-session",
            "value": "1",
            "domain": ".example.com",
        })]))
    }

    fn import_auth(&self, state: &AuthState) -> Result<()> {
        *self.applied_auth.lock().unwrap() = Some(state.clone());
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(PoolError::Driver("mock close failure".to_string()));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Mock session factory producing in-memory sessions.
///
/// Configurable to always fail, to fail after N successful creations,
/// to delay each creation (simulating launch latency), or to hand out
/// sessions whose close fails. Creation and close counts are tracked
/// with shared atomics for verification after the factory has been
/// moved into a pool.
pub struct MockSessionFactory {
    always_fail: Option<String>,
    fail_after: Option<(usize, String)>,
    create_delay: Duration,
    fail_close: bool,
    dead_on_arrival: bool,
    created: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MockSessionFactory {
    /// Factory where every creation succeeds instantly.
    pub fn new() -> Self {
        Self {
            always_fail: None,
            fail_after: None,
            create_delay: Duration::ZERO,
            fail_close: false,
            dead_on_arrival: false,
            created: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Factory where every creation fails with the given message.
    pub fn always_fails<S: Into<String>>(message: S) -> Self {
        Self {
            always_fail: Some(message.into()),
            ..Self::new()
        }
    }

    /// Factory that succeeds `n` times, then fails with the given
    /// message.
    pub fn fail_after_n<S: Into<String>>(n: usize, message: S) -> Self {
        Self {
            fail_after: Some((n, message.into())),
            ..Self::new()
        }
    }

    /// Delay each creation by `delay` (on the blocking thread), to
    /// simulate browser launch latency.
    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Hand out sessions whose close fails.
    pub fn with_failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Hand out sessions whose liveness probe reports dead.
    pub fn with_dead_sessions(mut self) -> Self {
        self.dead_on_arrival = true;
        self
    }

    /// Number of creation attempts so far.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of session closes so far.
    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shared creation counter, usable after the factory moves into a
    /// pool.
    pub fn created_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.created)
    }

    /// Shared close counter, usable after the factory moves into a
    /// pool.
    pub fn closed_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed)
    }
}

impl Default for MockSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFactory for MockSessionFactory {
    fn create(&self, mode: SessionMode) -> Result<Session> {
        if !self.create_delay.is_zero() {
            // Runs on a blocking thread in pool usage, so a real sleep
            // is the honest simulation.
            std::thread::sleep(self.create_delay);
        }

        let count = self.created.fetch_add(1, Ordering::SeqCst);

        if let Some(msg) = &self.always_fail {
            log::debug!("MockSessionFactory: returning configured failure");
            return Err(PoolError::CreationFailed(msg.clone()));
        }

        if let Some((n, msg)) = &self.fail_after {
            if count >= *n {
                log::debug!("MockSessionFactory: failing after {} creations", n);
                return Err(PoolError::CreationFailed(msg.clone()));
            }
        }

        let driver = MockDriver {
            visited: Mutex::new(Vec::new()),
            applied_auth: Mutex::new(None),
            alive: !self.dead_on_arrival,
            fail_close: self.fail_close,
            closed: Arc::clone(&self.closed),
        };

        Ok(Session::from_driver(Box::new(driver), mode))
    }
}

impl std::fmt::Debug for MockSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSessionFactory")
            .field("always_fail", &self.always_fail)
            .field("fail_after", &self.fail_after)
            .field("create_delay", &self.create_delay)
            .field("fail_close", &self.fail_close)
            .field("created", &self.created.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// A successful creation yields a live in-memory session.
    #[test]
    fn test_mock_factory_success() {
        let factory = MockSessionFactory::new();

        let session = factory.create(SessionMode::Headless).unwrap();
        assert!(session.is_alive());
        assert_eq!(session.mode(), SessionMode::Headless);
        assert_eq!(factory.created_count(), 1);
    }

    /// always_fails returns CreationFailed with the configured message.
    #[test]
    fn test_mock_factory_always_fails() {
        let factory = MockSessionFactory::always_fails("Test error");

        match factory.create(SessionMode::Headless) {
            Err(PoolError::CreationFailed(msg)) => assert_eq!(msg, "Test error"),
            other => panic!("Expected CreationFailed, got {:?}", other.map(|_| ())),
        }
        assert_eq!(factory.created_count(), 1);
    }

    /// fail_after_n succeeds exactly n times.
    #[test]
    fn test_mock_factory_fail_after_n() {
        let factory = MockSessionFactory::fail_after_n(2, "Exhausted");

        assert!(factory.create(SessionMode::Headless).is_ok());
        assert!(factory.create(SessionMode::Headless).is_ok());

        match factory.create(SessionMode::Headless) {
            Err(PoolError::CreationFailed(msg)) => assert_eq!(msg, "Exhausted"),
            other => panic!("Expected CreationFailed, got {:?}", other.map(|_| ())),
        }
    }

    /// Session ids are unique across creations.
    #[test]
    fn test_mock_sessions_have_unique_ids() {
        let factory = MockSessionFactory::new();

        let a = factory.create(SessionMode::Headless).unwrap();
        let b = factory.create(SessionMode::Headless).unwrap();
        assert_ne!(a.id(), b.id());
    }

    /// The mock driver records navigations and auth imports.
    #[test]
    fn test_mock_driver_records_activity() {
        let factory = MockSessionFactory::new();
        let session = factory.create(SessionMode::Headless).unwrap();

        session.navigate("https://example.com/a").unwrap();
        session.navigate("https://example.com/b").unwrap();

        let state = AuthState::new(vec![serde_json::json!({"name": "k", "value": "v"})]);
        session.apply_auth(&state).unwrap();

        let driver = session
            .driver()
            .as_any()
            .downcast_ref::<MockDriver>()
            .unwrap();
        assert_eq!(
            driver.visited(),
            vec!["https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(driver.applied_auth(), Some(state));
        assert!(session.page_source().unwrap().contains("example.com/b"));
    }
}
