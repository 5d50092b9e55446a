//! Convenient imports for common usage patterns.
//!
//! ```rust,ignore
//! use browser_session_pool::prelude::*;
//! ```
//!
//! This imports the pool, the lifecycle manager, the configuration and
//! factory types, the error/result pair, and the auth-state store.

pub use crate::config::{PoolConfig, PoolConfigBuilder};
pub use crate::error::{PoolError, Result};
pub use crate::factory::{ChromeSessionFactory, SessionFactory};
pub use crate::lifecycle::{LifecycleState, PoolLifecycleManager};
pub use crate::pool::{SessionPool, SessionPoolBuilder};
pub use crate::session::{Credentials, Session, SessionMode};
pub use crate::stats::{DrainReport, PoolStats};
pub use crate::store::{AuthState, AuthStateStore, console_ack_gate};
pub use crate::traits::Driver;

// Feature-gated exports
#[cfg(feature = "env-config")]
pub use crate::config::env::{chrome_path_from_env, from_env};

// Commonly needed alongside the factory types
pub use std::sync::Arc;
