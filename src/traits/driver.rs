//! The browser driver capability surface.
//!
//! The pool consumes, but never implements, a small set of driver
//! operations: navigation, page capture, auth-state transfer, a
//! liveness probe, and close. Everything site-specific (element
//! queries, typing, clicks) belongs to the automation script, which
//! can reach the concrete driver through [`Driver::as_any`].

use std::any::Any;

use crate::error::Result;
use crate::store::AuthState;

/// Capability surface of one live browser instance.
///
/// Implementors wrap a real browser (see
/// [`ChromeDriver`](crate::factory::ChromeDriver)) or an in-memory fake
/// for tests. The pool owns drivers only through
/// [`Session`](crate::Session), which guarantees close-at-most-once by
/// consuming itself.
///
/// # Thread Safety
///
/// `Send` is required because sessions move between tasks through the
/// ready queue. `Sync` is not: a session has exactly one owner at any
/// instant, so concurrent access never happens.
pub trait Driver: Send {
    /// Navigate to `url` and wait for the load to settle.
    fn navigate(&self, url: &str) -> Result<()>;

    /// Return the current page's HTML source.
    fn page_source(&self) -> Result<String>;

    /// Export the browser's current authentication state (cookies) as
    /// an opaque blob.
    fn export_auth(&self) -> Result<AuthState>;

    /// Import a previously captured authentication state into the
    /// browser.
    fn import_auth(&self, state: &AuthState) -> Result<()>;

    /// Cheap liveness probe: `true` while the underlying browser
    /// process is responsive.
    fn is_alive(&self) -> bool;

    /// Tear down the browser instance.
    ///
    /// Called exactly once, by [`Session::close`](crate::Session);
    /// implementations release the browser process and report failures
    /// rather than panicking.
    fn close(&mut self) -> Result<()>;

    /// Downcast hook for site scripts that need the concrete driver
    /// (tab handles, element queries).
    fn as_any(&self) -> &dyn Any;
}
