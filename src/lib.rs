//! # browser-session-pool
//!
//! Thread-safe browser session pool with cookie persistence and
//! lifecycle management for scripted web automation against a single
//! target site.
//!
//! This crate manages a pool of live browser sessions: concurrent,
//! non-blocking pre-creation of the target number of sessions; a
//! task-safe handoff queue with timeout-bounded acquisition;
//! persistence and reuse of an opaque authentication blob (cookies) so
//! interactive login happens once; and a coordinated, failure-tolerant
//! drain at shutdown.
//!
//! ## Features
//!
//! - **Non-blocking warm-up**: request N sessions, keep working, block
//!   only where a session is actually needed
//! - **Strict ownership**: a session has exactly one owner at any
//!   instant; double-close is a compile error, not a runtime bug
//! - **Failure isolation**: one failed launch or close never cancels
//!   its siblings; shortfalls are reported as counts
//! - **Auth-state reuse**: cookies round-trip as an opaque blob; an
//!   interactive visible-browser capture runs only when no blob exists
//! - **Graceful drain**: pending acquirers fail fast, in-flight
//!   launches finish (bounded), every session closes exactly once
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Your embedding program               │
//! │   (site scripts, scheduling, reporting)     │
//! └─────────────────┬───────────────────────────┘
//!                   │ start() / shutdown()
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │          PoolLifecycleManager               │
//! │  Uninitialized → AuthResolving → WarmingUp  │
//! │        → Ready → Draining → Closed          │
//! └──────┬──────────────────────────┬───────────┘
//!        │                          │
//!        ▼                          ▼
//! ┌──────────────────┐   ┌─────────────────────┐
//! │  AuthStateStore  │   │     SessionPool     │
//! │  load / save /   │   │ warm_up / acquire / │
//! │  interactive     │   │ release / discard / │
//! │  capture         │   │ drain_and_close_all │
//! └──────────────────┘   └──────────┬──────────┘
//!                                   │ SessionFactory
//!                                   ▼
//! ┌─────────────────────────────────────────────┐
//! │       Chrome/Chromium sessions              │
//! │    (driven via the headless_chrome CDP)     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use browser_session_pool::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PoolConfigBuilder::new()
//!         .pool_size(4)
//!         .target_url("https://app.example.com/")
//!         .build()?;
//!
//!     let mut manager = PoolLifecycleManager::new(
//!         config,
//!         Arc::new(ChromeSessionFactory::with_defaults()),
//!     )?;
//!
//!     // First run: opens a visible browser and waits for you to log
//!     // in, then persists the cookies. Later runs load the blob and
//!     // skip straight to warm-up.
//!     manager.start().await?;
//!
//!     // Run a site script on one pooled session.
//!     let auth = manager.auth_state().cloned();
//!     manager
//!         .pool()
//!         .with_session(Duration::from_secs(30), |session| {
//!             if let Some(auth) = &auth {
//!                 session.apply_auth(auth)?;
//!             }
//!             session.navigate("https://app.example.com/dashboard")?;
//!             session.page_source()
//!         })
//!         .await?;
//!
//!     let report = manager.shutdown().await;
//!     println!("closed {} sessions, {} failures", report.closed, report.failed());
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Configuration
//!
//! With the `env-config` feature (default), configuration can be loaded
//! from the environment, optionally seeded from an `app.env` file:
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `SESSION_POOL_SIZE` | usize | 4 | Target pool size |
//! | `SESSION_MAX_LAUNCHES` | usize | 4 | Concurrent launch cap |
//! | `SESSION_HEADLESS` | bool | true | Pool session mode |
//! | `SESSION_ACQUIRE_TIMEOUT_SECONDS` | u64 | 30 | Default acquire wait |
//! | `SESSION_CLOSE_TIMEOUT_SECONDS` | u64 | 30 | Drain wait |
//! | `AUTH_STATE_PATH` | String | `data/cookie.json` | Auth blob path |
//! | `TARGET_URL` | String | unset | Site under automation |
//! | `CHROME_PATH` | String | auto | Custom Chrome binary path |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `env-config` | Environment-based configuration (default) |
//! | `test-utils` | In-memory mock factory for testing |
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, PoolError>`](Result).
//! Per-session failures are isolated: a failed launch is a counted
//! shortfall, a failed close lands in the [`DrainReport`], and neither
//! cancels sibling operations. Only a fully failed warm-up surfaces as
//! a hard error, from
//! [`PoolLifecycleManager::await_capacity`].
//!
//! ## Testing
//!
//! Enable the `test-utils` feature and use
//! [`MockSessionFactory`](factory::mock::MockSessionFactory) to
//! exercise pool behavior without a browser installed:
//!
//! ```rust,ignore
//! use browser_session_pool::factory::mock::MockSessionFactory;
//!
//! let pool = SessionPool::builder()
//!     .factory(Arc::new(MockSessionFactory::new()))
//!     .build()?;
//! ```

#![doc(html_root_url = "https://docs.rs/browser-session-pool/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// Modules
// ============================================================================

pub mod config;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod pool;
pub mod prelude;
pub mod session;
pub mod stats;
pub mod store;
pub mod traits;

// ============================================================================
// Re-exports (Public API)
// ============================================================================

pub use config::{PoolConfig, PoolConfigBuilder};
pub use error::{PoolError, Result};
pub use factory::{ChromeDriver, ChromeSessionFactory, SessionFactory, create_launch_options};
pub use lifecycle::{LifecycleState, PoolLifecycleManager};
pub use pool::{SessionPool, SessionPoolBuilder};
pub use session::{Credentials, Session, SessionMode};
pub use stats::{DrainReport, PoolStats};
pub use store::{AuthState, AuthStateStore, console_ack_gate};
pub use traits::Driver;

// Feature-gated re-exports
#[cfg(feature = "env-config")]
pub use config::env::{chrome_path_from_env, from_env};
