//! Common test utilities for skillforge integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/skillforge/` directory.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use skillforge::storage::ProfileStore;
pub use tempfile::TempDir;

/// A test environment with an isolated data directory.
///
/// Stores are opened with an explicit data root instead of
/// `SKILLFORGE_DATA_DIR`, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Open (or create) a file-backed profile.
    pub fn open_store(&self, profile: &str) -> ProfileStore {
        ProfileStore::open_with_data_dir(profile, self.data_path()).unwrap()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed reference time, 09:00 UTC on the given day of May 2026.
pub fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap() + Duration::days(n)
}
