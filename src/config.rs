//! Configuration for session pool behavior and limits.
//!
//! This module provides [`PoolConfig`] and [`PoolConfigBuilder`] for
//! configuring pool size, launch concurrency, session mode, timeouts,
//! and the auth-state location.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use browser_session_pool::PoolConfigBuilder;
//!
//! let config = PoolConfigBuilder::new()
//!     .pool_size(8)
//!     .max_concurrent_launches(4)
//!     .close_timeout(Duration::from_secs(20))
//!     .target_url("https://app.example.com/")
//!     .build()
//!     .expect("Invalid configuration");
//!
//! assert_eq!(config.pool_size, 8);
//! ```
//!
//! # Environment Configuration
//!
//! When the `env-config` feature is enabled, configuration can be loaded
//! from environment variables and an optional `app.env` file:
//!
//! ```rust,ignore
//! use browser_session_pool::config::env::from_env;
//!
//! let config = from_env()?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::session::SessionMode;

/// Configuration for session pool behavior and limits.
///
/// # Fields Overview
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `pool_size` | 4 | Target number of sessions |
/// | `max_concurrent_launches` | 4 | Cap on simultaneous browser starts |
/// | `mode` | Headless | Session mode for the pool |
/// | `acquire_timeout` | 30s | Default acquisition wait |
/// | `close_timeout` | 30s | Drain wait for in-flight creations |
/// | `auth_state_path` | `data/cookie.json` | Persisted auth blob location |
/// | `target_url` | None | Site under automation (required for capture) |
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Target number of sessions to warm up.
    pub pool_size: usize,

    /// Maximum number of browser processes launching (or closing) at
    /// the same time. Bounds resource usage during fan-out; the
    /// effective bound is `min(pool_size, max_concurrent_launches)`.
    pub max_concurrent_launches: usize,

    /// Mode used for pooled sessions. Interactive auth capture always
    /// uses a visible session regardless of this setting.
    pub mode: SessionMode,

    /// Default timeout used by convenience helpers that acquire a
    /// session without an explicit timeout.
    pub acquire_timeout: Duration,

    /// How long a drain waits for in-flight creation tasks before
    /// abandoning them.
    pub close_timeout: Duration,

    /// Where the opaque auth-state blob is persisted.
    pub auth_state_path: PathBuf,

    /// The single site this pool automates. Required before interactive
    /// capture can run; `None` is valid when an auth state already
    /// exists on disk.
    pub target_url: Option<Url>,
}

impl Default for PoolConfig {
    /// Defaults matched to a small single-site automation run:
    /// four sessions, four concurrent launches, headless, 30 second
    /// timeouts, auth blob under `data/`.
    fn default() -> Self {
        Self {
            pool_size: 4,
            max_concurrent_launches: 4,
            mode: SessionMode::Headless,
            acquire_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(30),
            auth_state_path: PathBuf::from("data/cookie.json"),
            target_url: None,
        }
    }
}

/// Builder for [`PoolConfig`] with validation.
///
/// # Validation
///
/// The [`build()`](Self::build) method validates:
/// - `pool_size` must be greater than 0
/// - `max_concurrent_launches` must be greater than 0
/// - `target_url`, when set, must parse as an absolute URL
pub struct PoolConfigBuilder {
    config: PoolConfig,
    raw_target_url: Option<String>,
}

impl PoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            config: PoolConfig::default(),
            raw_target_url: None,
        }
    }

    /// Set the target pool size (must be > 0).
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Set the cap on simultaneous browser launches (must be > 0).
    pub fn max_concurrent_launches(mut self, cap: usize) -> Self {
        self.config.max_concurrent_launches = cap;
        self
    }

    /// Set the session mode for pooled sessions.
    pub fn mode(mut self, mode: SessionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the default acquire timeout for convenience helpers.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.acquire_timeout = timeout;
        self
    }

    /// Set how long a drain waits on in-flight creations.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    /// Set where the auth-state blob is persisted.
    pub fn auth_state_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.auth_state_path = path.into();
        self
    }

    /// Set the site under automation. Validated at build time.
    pub fn target_url<S: Into<String>>(mut self, url: S) -> Self {
        self.raw_target_url = Some(url.into());
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// - Returns error if `pool_size` is 0
    /// - Returns error if `max_concurrent_launches` is 0
    /// - Returns error if `target_url` does not parse
    pub fn build(mut self) -> std::result::Result<PoolConfig, String> {
        if self.config.pool_size == 0 {
            return Err("pool_size must be greater than 0".to_string());
        }

        if self.config.max_concurrent_launches == 0 {
            return Err("max_concurrent_launches must be greater than 0".to_string());
        }

        if let Some(raw) = self.raw_target_url.take() {
            let parsed = Url::parse(&raw)
                .map_err(|e| format!("target_url {:?} is not a valid URL: {}", raw, e))?;
            self.config.target_url = Some(parsed);
        }

        Ok(self.config)
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Environment Configuration (feature-gated)
// ============================================================================

/// Environment-based configuration loading.
///
/// This module is only available when the `env-config` feature is enabled.
/// Variables are read from the process environment, optionally seeded from
/// an `app.env` file in the current directory (via `dotenvy`).
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `SESSION_POOL_SIZE` | usize | 4 | Target pool size |
/// | `SESSION_MAX_LAUNCHES` | usize | 4 | Concurrent launch cap |
/// | `SESSION_HEADLESS` | bool | true | Pool session mode |
/// | `SESSION_ACQUIRE_TIMEOUT_SECONDS` | u64 | 30 | Default acquire wait |
/// | `SESSION_CLOSE_TIMEOUT_SECONDS` | u64 | 30 | Drain wait |
/// | `AUTH_STATE_PATH` | String | `data/cookie.json` | Auth blob path |
/// | `TARGET_URL` | String | unset | Site under automation |
/// | `CHROME_PATH` | String | auto | Custom Chrome binary path |
#[cfg(feature = "env-config")]
pub mod env {
    use super::*;
    use crate::error::PoolError;

    /// Default environment file name.
    pub const ENV_FILE_NAME: &str = "app.env";

    /// Load environment variables from the `app.env` file.
    ///
    /// Automatically called by [`from_env`]; call it explicitly to load
    /// the file earlier or to check for errors.
    pub fn load_env_file() -> std::result::Result<std::path::PathBuf, dotenvy::Error> {
        dotenvy::from_filename(ENV_FILE_NAME)
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Configuration`] if the resulting values fail
    /// validation (including an unparseable `TARGET_URL`).
    pub fn from_env() -> std::result::Result<PoolConfig, PoolError> {
        match load_env_file() {
            Ok(path) => {
                log::info!("Loaded configuration from: {:?}", path);
            }
            Err(e) => {
                log::debug!(
                    "No {} file found or failed to load: {} (using environment variables and defaults)",
                    ENV_FILE_NAME,
                    e
                );
            }
        }

        let pool_size = std::env::var("SESSION_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4);

        let max_launches = std::env::var("SESSION_MAX_LAUNCHES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4);

        let headless = std::env::var("SESSION_HEADLESS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        let acquire_timeout_secs = std::env::var("SESSION_ACQUIRE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30u64);

        let close_timeout_secs = std::env::var("SESSION_CLOSE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30u64);

        let auth_state_path = std::env::var("AUTH_STATE_PATH")
            .unwrap_or_else(|_| "data/cookie.json".to_string());

        let target_url = std::env::var("TARGET_URL").ok();

        log::info!("Loading pool configuration from environment:");
        log::info!("   - Pool size: {}", pool_size);
        log::info!("   - Max concurrent launches: {}", max_launches);
        log::info!("   - Headless: {}", headless);
        log::info!("   - Acquire timeout: {}s", acquire_timeout_secs);
        log::info!("   - Close timeout: {}s", close_timeout_secs);
        log::info!("   - Auth state path: {}", auth_state_path);
        log::info!(
            "   - Target URL: {}",
            target_url.as_deref().unwrap_or("unset")
        );

        let mut builder = PoolConfigBuilder::new()
            .pool_size(pool_size)
            .max_concurrent_launches(max_launches)
            .mode(if headless {
                SessionMode::Headless
            } else {
                SessionMode::Visible
            })
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .close_timeout(Duration::from_secs(close_timeout_secs))
            .auth_state_path(auth_state_path);

        if let Some(url) = target_url {
            builder = builder.target_url(url);
        }

        builder.build().map_err(PoolError::Configuration)
    }

    /// Get the Chrome binary path from the environment.
    ///
    /// Reads `CHROME_PATH`; `None` means auto-detection.
    pub fn chrome_path_from_env() -> Option<String> {
        std::env::var("CHROME_PATH").ok()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Verifies that PoolConfigBuilder correctly sets all values.
    #[test]
    fn test_config_builder() {
        let config = PoolConfigBuilder::new()
            .pool_size(10)
            .max_concurrent_launches(3)
            .mode(SessionMode::Visible)
            .acquire_timeout(Duration::from_secs(5))
            .close_timeout(Duration::from_secs(120))
            .auth_state_path("state/auth.json")
            .target_url("https://app.example.com/login")
            .build()
            .unwrap();

        assert_eq!(config.pool_size, 10);
        assert_eq!(config.max_concurrent_launches, 3);
        assert_eq!(config.mode, SessionMode::Visible);
        assert_eq!(config.acquire_timeout.as_secs(), 5);
        assert_eq!(config.close_timeout.as_secs(), 120);
        assert_eq!(config.auth_state_path, PathBuf::from("state/auth.json"));
        assert_eq!(
            config.target_url.unwrap().as_str(),
            "https://app.example.com/login"
        );
    }

    /// Verifies that the builder rejects a zero pool size.
    #[test]
    fn test_config_validation_pool_size() {
        let result = PoolConfigBuilder::new().pool_size(0).build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err();
        assert!(
            err_msg.contains("pool_size must be greater than 0"),
            "Expected validation error message, got: {}",
            err_msg
        );
    }

    /// Verifies that the builder rejects a zero launch cap.
    #[test]
    fn test_config_validation_launch_cap() {
        let result = PoolConfigBuilder::new().max_concurrent_launches(0).build();

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("max_concurrent_launches"));
    }

    /// Verifies that an invalid target URL is rejected at build time.
    #[test]
    fn test_config_validation_target_url() {
        let result = PoolConfigBuilder::new().target_url("not a url").build();

        assert!(result.is_err());
        assert!(result.unwrap_err().contains("not a valid URL"));
    }

    /// Verifies the default configuration values.
    #[test]
    fn test_config_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.pool_size, 4, "Default pool size should be 4");
        assert_eq!(config.max_concurrent_launches, 4);
        assert_eq!(config.mode, SessionMode::Headless);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.close_timeout, Duration::from_secs(30));
        assert_eq!(config.auth_state_path, PathBuf::from("data/cookie.json"));
        assert!(config.target_url.is_none());
    }

    /// Verifies that PoolConfigBuilder implements Default.
    #[test]
    fn test_builder_default() {
        let builder: PoolConfigBuilder = Default::default();
        let config = builder.build().unwrap();

        assert_eq!(config.pool_size, 4);
        assert!(config.target_url.is_none());
    }
}
