//! Chrome/Chromium session factory.
//!
//! This module provides [`ChromeSessionFactory`], which launches
//! headless or visible Chrome instances via the `headless_chrome`
//! crate, and [`ChromeDriver`], the [`Driver`] implementation over a
//! launched browser.
//!
//! # Example
//!
//! ```rust,ignore
//! use browser_session_pool::{ChromeSessionFactory, SessionMode, SessionFactory};
//!
//! // Auto-detect the Chrome installation
//! let factory = ChromeSessionFactory::with_defaults();
//! let session = factory.create(SessionMode::Headless)?;
//!
//! // Or pin a binary path
//! let factory = ChromeSessionFactory::with_path("/usr/bin/chromium".to_string());
//! ```

use std::any::Any;
use std::sync::Arc;

use headless_chrome::protocol::cdp::Network::{Cookie, CookieParam};
use headless_chrome::{Browser, LaunchOptions, Tab};

use super::SessionFactory;
use crate::error::{PoolError, Result};
use crate::session::{Session, SessionMode};
use crate::store::AuthState;
use crate::traits::Driver;

/// Factory launching Chrome/Chromium sessions.
///
/// Holds a launch-options closure so each launch can react to the
/// requested [`SessionMode`] (the interactive capture path asks for a
/// visible window while the pool stays headless).
pub struct ChromeSessionFactory {
    /// Generates launch options for each session launch.
    launch_options_fn:
        Box<dyn Fn(SessionMode) -> Result<LaunchOptions<'static>> + Send + Sync>,
}

impl ChromeSessionFactory {
    /// Create a factory with a custom launch-options function.
    pub fn new<F>(launch_options_fn: F) -> Self
    where
        F: Fn(SessionMode) -> Result<LaunchOptions<'static>> + Send + Sync + 'static,
    {
        Self {
            launch_options_fn: Box::new(launch_options_fn),
        }
    }

    /// Create a factory with an auto-detected Chrome path.
    ///
    /// `headless_chrome` searches the usual installation paths on
    /// Linux, macOS, and Windows.
    pub fn with_defaults() -> Self {
        log::debug!("Creating ChromeSessionFactory with auto-detect");
        Self::new(|mode| {
            create_launch_options(mode, None)
                .map_err(|e| PoolError::Configuration(e.to_string()))
        })
    }

    /// Create a factory pinned to a Chrome/Chromium binary path.
    pub fn with_path(chrome_path: String) -> Self {
        log::debug!(
            "Creating ChromeSessionFactory with custom path: {}",
            chrome_path
        );
        Self::new(move |mode| {
            create_launch_options(mode, Some(&chrome_path))
                .map_err(|e| PoolError::Configuration(e.to_string()))
        })
    }
}

impl SessionFactory for ChromeSessionFactory {
    fn create(&self, mode: SessionMode) -> Result<Session> {
        let options = (self.launch_options_fn)(mode)?;

        log::debug!("Launching Chrome ({:?})...", mode);
        let browser = Browser::new(options).map_err(|e| {
            log::error!("Chrome launch failed: {}", e);
            PoolError::CreationFailed(e.to_string())
        })?;

        let driver = ChromeDriver::new(browser)?;
        Ok(Session::from_driver(Box::new(driver), mode))
    }
}

/// [`Driver`] implementation over a launched Chrome instance.
///
/// Keeps one pinned tab for the session's scripted work; opening that
/// tab doubles as launch validation, so a dead browser never reaches
/// the pool.
pub struct ChromeDriver {
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeDriver {
    /// Wrap a launched browser, opening the scripting tab.
    pub fn new(browser: Browser) -> Result<Self> {
        let tab = browser.new_tab().map_err(|e| {
            log::error!("Browser validation failed at new_tab(): {}", e);
            PoolError::CreationFailed(e.to_string())
        })?;

        Ok(Self { browser, tab })
    }

    /// The session's scripting tab, for site scripts that downcast via
    /// [`Driver::as_any`].
    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }
}

impl Driver for ChromeDriver {
    fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| PoolError::Driver(format!("navigate to {}: {}", url, e)))
    }

    fn page_source(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| PoolError::Driver(format!("page source: {}", e)))
    }

    fn export_auth(&self) -> Result<AuthState> {
        let cookies: Vec<Cookie> = self
            .tab
            .get_cookies()
            .map_err(|e| PoolError::Driver(format!("cookie export: {}", e)))?;

        let records = cookies
            .into_iter()
            .map(|c| {
                serde_json::to_value(c)
                    .map_err(|e| PoolError::Driver(format!("cookie encode: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(AuthState::new(records))
    }

    fn import_auth(&self, state: &AuthState) -> Result<()> {
        let params = state
            .records()
            .iter()
            .cloned()
            .map(|record| {
                serde_json::from_value::<CookieParam>(record)
                    .map_err(|e| PoolError::Driver(format!("cookie decode: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.tab
            .set_cookies(params)
            .map_err(|e| PoolError::Driver(format!("cookie import: {}", e)))
    }

    fn is_alive(&self) -> bool {
        self.browser.get_version().is_ok()
    }

    fn close(&mut self) -> Result<()> {
        // Best effort: the tab may already be gone if the process died.
        // Dropping the Browser terminates the process itself.
        if let Err(e) = self.tab.close(true) {
            log::debug!("Scripting tab close failed (browser may be gone): {}", e);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Build Chrome launch options for the given mode.
///
/// Applies the flag set proven out for stable pooled operation:
/// container-friendly shared memory, GPU features off, background
/// throttling off, automation mode on.
///
/// # Parameters
///
/// * `mode` - Headless for pooled sessions, Visible for interactive
///   capture.
/// * `chrome_path` - Optional custom binary path; `None` auto-detects.
pub fn create_launch_options(
    mode: SessionMode,
    chrome_path: Option<&str>,
) -> std::result::Result<LaunchOptions<'static>, Box<dyn std::error::Error + Send + Sync>> {
    match chrome_path {
        Some(path) => log::debug!("Creating launch options with custom path: {}", path),
        None => log::debug!("Creating launch options (auto-detect browser)"),
    }

    let mut builder = LaunchOptions::default_builder();

    if let Some(path) = chrome_path {
        builder.path(Some(path.to_string().into()));
    }

    builder
        .headless(mode.is_headless())
        .sandbox(false) // Required in containers
        .disable_default_args(true)
        .args(vec![
            // Memory and stability
            "--disable-dev-shm-usage".as_ref(), // Use /tmp instead of /dev/shm
            "--disable-crash-reporter".as_ref(),
            // GPU features are useless for scripted sessions
            "--disable-gpu-compositing".as_ref(),
            "--disable-software-rasterizer".as_ref(),
            "--disable-accelerated-2d-canvas".as_ref(),
            "--disable-webgl".as_ref(),
            "--disable-webgl2".as_ref(),
            // No extensions, plugins, or sync in automation sessions
            "--disable-extensions".as_ref(),
            "--disable-plugins".as_ref(),
            "--disable-sync".as_ref(),
            "--disable-default-apps".as_ref(),
            // Automation
            "--enable-automation".as_ref(),
            // Keep backgrounded sessions responsive while queued
            "--disable-background-timer-throttling".as_ref(),
            "--disable-backgrounding-occluded-windows".as_ref(),
            "--disable-hang-monitor".as_ref(),
            "--disable-popup-blocking".as_ref(),
            "--disable-renderer-backgrounding".as_ref(),
            "--disable-ipc-flooding-protection".as_ref(),
        ])
        .build()
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> {
            let path_msg = chrome_path.unwrap_or("auto-detect");
            log::error!(
                "Failed to build Chrome launch options (path: {}): {}",
                path_msg,
                e
            );
            e.into()
        })
}

// ============================================================================
// Unit Tests
// ============================================================================
