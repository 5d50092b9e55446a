//! Owned session handles.
//!
//! This module provides [`Session`], the opaque handle to one live
//! browser instance, plus [`SessionMode`] and the [`Credentials`]
//! record handed to site scripts.
//!
//! # Ownership
//!
//! A `Session` has exactly one owner at any instant: the pool's ready
//! queue, the caller that acquired it, or the close path. It is not
//! `Clone`, and [`close`](Session::close) consumes it, so a session can
//! never be queued twice or closed twice. Ownership transfers happen
//! only by moving the value through
//! [`acquire`](crate::SessionPool::acquire) /
//! [`release`](crate::SessionPool::release) /
//! [`discard`](crate::SessionPool::discard).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::store::AuthState;
use crate::traits::Driver;

/// Whether a session runs with a visible browser window.
///
/// Pooled sessions normally run [`Headless`](SessionMode::Headless);
/// interactive auth capture always uses [`Visible`](SessionMode::Visible)
/// because a human has to complete the login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// No visible window; the mode for pooled automation sessions.
    Headless,
    /// Visible window, required for interactive auth capture.
    Visible,
}

impl SessionMode {
    /// `true` for [`SessionMode::Headless`].
    #[inline]
    pub fn is_headless(self) -> bool {
        matches!(self, SessionMode::Headless)
    }
}

/// Account credentials handed to a site script alongside a session.
///
/// The pool core never reads these; they exist so embedding programs
/// have one well-known shape to pass login material through.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name or email.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    // Keep passwords out of logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An opaque handle to one live browser instance.
///
/// Created by a [`SessionFactory`](crate::SessionFactory), handed out
/// by [`SessionPool::acquire`](crate::SessionPool::acquire), and
/// destroyed exactly once via [`close`](Session::close) (reached
/// through `discard` or the drain).
pub struct Session {
    /// Process-unique identity, assigned from an atomic counter.
    id: u64,

    /// Mode the session was launched with.
    mode: SessionMode,

    /// The live browser behind this handle.
    driver: Box<dyn Driver>,

    /// Launch timestamp, for age reporting.
    created_at: Instant,
}

impl Session {
    /// Wrap a freshly launched driver in an owned session handle.
    ///
    /// Factories call this once per successful launch; the id counter
    /// guarantees no two sessions ever share an identity.
    pub fn from_driver(driver: Box<dyn Driver>, mode: SessionMode) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            mode,
            driver,
            created_at: Instant::now(),
        }
    }

    /// The session's unique identity.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Mode the session was launched with.
    #[inline]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Time since the session was launched.
    #[inline]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Navigate to `url` and wait for the load to settle.
    pub fn navigate(&self, url: &str) -> Result<()> {
        log::debug!("Session {} navigating to {}", self.id, url);
        self.driver.navigate(url)
    }

    /// Return the current page's HTML source.
    pub fn page_source(&self) -> Result<String> {
        self.driver.page_source()
    }

    /// Export the browser's current authentication state.
    pub fn export_auth(&self) -> Result<AuthState> {
        self.driver.export_auth()
    }

    /// Import a previously captured authentication state.
    ///
    /// The pool never applies auth state on its own; whether and when a
    /// script authenticates its session is the script's decision.
    pub fn apply_auth(&self, state: &AuthState) -> Result<()> {
        log::debug!(
            "Session {} importing {} auth records",
            self.id,
            state.len()
        );
        self.driver.import_auth(state)
    }

    /// Cheap liveness probe.
    pub fn is_alive(&self) -> bool {
        self.driver.is_alive()
    }

    /// Borrow the driver, e.g. to downcast to the concrete
    /// implementation for site-specific work.
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Tear down the browser instance.
    ///
    /// Consumes the session, so a second close is a compile error
    /// rather than a runtime bug. Reached through
    /// [`discard`](crate::SessionPool::discard) or the drain.
    pub(crate) fn close(mut self) -> Result<()> {
        log::debug!("Closing session {} (age {:?})", self.id, self.age());
        self.driver.close().map_err(|e| crate::PoolError::CloseFailed {
            id: self.id,
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("age", &self.age())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_mode_is_headless() {
        assert!(SessionMode::Headless.is_headless());
        assert!(!SessionMode::Visible.is_headless());
    }

    /// Credentials must never leak the password through Debug.
    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
        };

        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("alice"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
