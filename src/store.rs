//! Authentication-state persistence and interactive capture.
//!
//! This module provides [`AuthState`], the opaque cookie blob reused
//! across runs, and [`AuthStateStore`], which persists it and runs the
//! one-time interactive capture when no blob exists yet.
//!
//! # Opacity
//!
//! The store treats the blob as a list of opaque JSON records: it must
//! round-trip through save → load unchanged, and nothing here inspects
//! record contents. In particular there is no expiry or validity check:
//! a stale state is used until the file is deleted. That mirrors the
//! system this pool manages; a freshness policy would be an explicit
//! extension hooked in front of [`AuthStateStore::load`].

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};
use crate::factory::SessionFactory;
use crate::session::SessionMode;
use url::Url;

/// Opaque authentication state: a list of cookie records.
///
/// Equality is JSON-value equality; this is the round-trip equality the
/// store guarantees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthState(Vec<serde_json::Value>);

impl AuthState {
    /// Wrap a list of opaque records.
    pub fn new(records: Vec<serde_json::Value>) -> Self {
        Self(records)
    }

    /// Number of records in the blob.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the blob holds no records.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the raw records.
    pub fn records(&self) -> &[serde_json::Value] {
        &self.0
    }
}

/// Persists and loads the opaque auth-state blob, and runs the
/// interactive capture fallback when no blob exists.
#[derive(Debug, Clone)]
pub struct AuthStateStore {
    path: PathBuf,
}

impl AuthStateStore {
    /// Create a store over the given file path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// The file path this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a persisted blob exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the persisted blob.
    ///
    /// # Errors
    ///
    /// - [`PoolError::AuthStateMissing`] when no file exists.
    /// - [`PoolError::AuthStateCorrupt`] when the file cannot be read or
    ///   parsed. Callers treat this like a missing state (re-capture),
    ///   but the condition is surfaced, never silently ignored.
    pub fn load(&self) -> Result<AuthState> {
        if !self.exists() {
            return Err(PoolError::AuthStateMissing(self.path.clone()));
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| PoolError::AuthStateCorrupt(format!("{}: {}", self.path.display(), e)))?;

        let state: AuthState = serde_json::from_str(&raw)
            .map_err(|e| PoolError::AuthStateCorrupt(format!("{}: {}", self.path.display(), e)))?;

        log::info!(
            "Loaded {} auth records from {}",
            state.len(),
            self.path.display()
        );
        Ok(state)
    }

    /// Persist the blob, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::AuthStateWrite`] on any I/O or
    /// serialization failure.
    pub fn save(&self, state: &AuthState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    PoolError::AuthStateWrite(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        let raw = serde_json::to_string_pretty(state)
            .map_err(|e| PoolError::AuthStateWrite(e.to_string()))?;

        let mut file = fs::File::create(&self.path)
            .map_err(|e| PoolError::AuthStateWrite(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(raw.as_bytes())
            .map_err(|e| PoolError::AuthStateWrite(format!("{}: {}", self.path.display(), e)))?;

        log::info!(
            "Saved {} auth records to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Capture auth state interactively.
    ///
    /// Opens one *visible* session regardless of the pool's configured
    /// mode, navigates to `target_url`, and blocks on `ack` (the
    /// human-acknowledgment gate, with no timeout by design) before
    /// exporting the session's cookies. The capture session is closed on
    /// every exit path, including gate and export failures.
    ///
    /// This is a blocking call (it waits on a human); run it under
    /// `spawn_blocking` from async contexts, as
    /// [`PoolLifecycleManager`](crate::PoolLifecycleManager) does.
    ///
    /// # Errors
    ///
    /// - [`PoolError::CreationFailed`] if the visible session cannot
    ///   launch.
    /// - [`PoolError::CaptureAborted`] if the gate fails (e.g. stdin
    ///   closed).
    /// - Driver errors from navigation or cookie export.
    pub fn capture_interactive<F>(
        &self,
        factory: &dyn SessionFactory,
        target_url: &Url,
        ack: F,
    ) -> Result<AuthState>
    where
        F: FnOnce() -> std::io::Result<()>,
    {
        log::info!(
            "No usable auth state; opening a visible session on {} for interactive capture",
            target_url
        );

        let session = factory.create(SessionMode::Visible)?;
        let result = Self::capture_from(&session, target_url, ack);

        // The capture session never joins the pool; close it no matter
        // how the capture itself went.
        if let Err(e) = session.close() {
            log::warn!("Failed to close capture session: {}", e);
        }

        result
    }

    fn capture_from<F>(
        session: &crate::Session,
        target_url: &Url,
        ack: F,
    ) -> Result<AuthState>
    where
        F: FnOnce() -> std::io::Result<()>,
    {
        session.navigate(target_url.as_str())?;

        log::info!("Waiting for operator acknowledgment...");
        ack().map_err(|e| PoolError::CaptureAborted(e.to_string()))?;

        let state = session.export_auth()?;
        log::info!("Captured {} auth records", state.len());
        Ok(state)
    }
}

/// The default acknowledgment gate: prompt on stdout, block until the
/// operator presses Enter.
pub fn console_ack_gate() -> impl FnOnce() -> std::io::Result<()> {
    || {
        println!("Complete the login in the opened browser window, then press Enter to continue...");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| ())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
