//! Session factory implementations.
//!
//! This module provides the [`SessionFactory`] trait and the concrete
//! factories for creating live sessions.
//!
//! # Overview
//!
//! The factory is the pool's only unit of true I/O-bound latency: it
//! launches one browser process and wraps it in a [`Session`]. Launch
//! failures surface as [`PoolError::CreationFailed`] and are never
//! retried inside the factory; retry and shortfall policy belong to
//! the pool.
//!
//! # Available Factories
//!
//! | Factory | Description |
//! |---------|-------------|
//! | [`ChromeSessionFactory`] | Launches Chrome/Chromium sessions |
//! | [`mock::MockSessionFactory`] | In-memory sessions for tests (feature-gated) |
//!
//! [`PoolError::CreationFailed`]: crate::PoolError::CreationFailed

mod chrome;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use chrome::{ChromeDriver, ChromeSessionFactory, create_launch_options};

use crate::error::Result;
use crate::session::{Session, SessionMode};

/// Trait for the session factory pattern.
///
/// Abstracts session creation so the pool can run against Chrome in
/// production and against in-memory drivers in tests.
///
/// # Thread Safety
///
/// `Send + Sync` is required because one factory is shared by all of
/// the pool's concurrent creation workers.
pub trait SessionFactory: Send + Sync {
    /// Launch one live session in the given mode.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::CreationFailed`](crate::PoolError::CreationFailed)
    /// if the browser fails to launch. The factory never retries; a
    /// failure is one counted shortfall in the pool's warm-up.
    fn create(&self, mode: SessionMode) -> Result<Session>;
}
