//! Error types for the session pool.
//!
//! This module provides [`PoolError`], a unified error type for all
//! session pool operations, and a convenient [`Result`] type alias.
//!
//! # Example
//!
//! ```rust
//! use browser_session_pool::{PoolError, Result};
//!
//! fn fetch_page() -> Result<String> {
//!     // Your logic here...
//!     Err(PoolError::Configuration("example error".to_string()))
//! }
//!
//! match fetch_page() {
//!     Ok(html) => println!("Got {} bytes", html.len()),
//!     Err(PoolError::PoolClosed) => println!("Pool is draining"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur during session pool operations.
///
/// Each variant maps to one failure class of the pool's lifecycle:
/// per-session launch and close failures are isolated and non-fatal,
/// acquisition failures are recoverable by the caller, and auth-state
/// failures trigger re-capture rather than aborting startup.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// One session launch failed.
    ///
    /// Non-fatal to the pool: the slot is counted as a shortfall and the
    /// remaining creation tasks keep running. Retry policy belongs to the
    /// caller, never to the factory.
    #[error("failed to create session: {0}")]
    CreationFailed(String),

    /// No session became ready before the acquire timeout elapsed.
    ///
    /// Recoverable: the caller retries or fails its own unit of work.
    /// Returned instead of blocking forever on a permanently undersized
    /// pool.
    #[error("no session became ready within {0:?}")]
    AcquireTimeout(Duration),

    /// Operation attempted on a draining or closed pool.
    ///
    /// Once [`drain_and_close_all`](crate::SessionPool::drain_and_close_all)
    /// begins, pending and future acquisitions observe this error fast
    /// rather than waiting out their timeout.
    #[error("pool is draining or closed")]
    PoolClosed,

    /// No persisted auth state exists at the configured path.
    ///
    /// Triggers interactive capture at lifecycle start; not fatal.
    #[error("auth state not found at {0}")]
    AuthStateMissing(PathBuf),

    /// The persisted auth state could not be parsed.
    ///
    /// Treated exactly like a missing state (re-capture), but surfaced
    /// distinctly so the condition is never silently ignored.
    #[error("auth state unreadable: {0}")]
    AuthStateCorrupt(String),

    /// Writing the auth state to stable storage failed.
    #[error("failed to persist auth state: {0}")]
    AuthStateWrite(String),

    /// Closing one session failed.
    ///
    /// Collected into the shutdown [`DrainReport`](crate::DrainReport);
    /// never aborts the drain of the remaining sessions.
    #[error("failed to close session {id}: {reason}")]
    CloseFailed {
        /// Identity of the session whose close failed.
        id: u64,
        /// Underlying driver failure.
        reason: String,
    },

    /// The interactive auth capture was abandoned before completion.
    ///
    /// No automatic recovery; surfaces to the operator. The capture
    /// session itself is still closed.
    #[error("interactive capture aborted: {0}")]
    CaptureAborted(String),

    /// A driver command (navigate, cookie transfer, page read) failed.
    #[error("driver command failed: {0}")]
    Driver(String),

    /// Invalid configuration or an operation invoked from the wrong
    /// lifecycle state.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<String> for PoolError {
    fn from(msg: String) -> Self {
        PoolError::Configuration(msg)
    }
}

impl From<&str> for PoolError {
    fn from(msg: &str) -> Self {
        PoolError::Configuration(msg.to_string())
    }
}

/// Result type alias using [`PoolError`].
pub type Result<T> = std::result::Result<T, PoolError>;

// ============================================================================
// Unit Tests
// ============================================================================
