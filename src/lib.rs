//! Skillforge - skill progression and XP tracking for fighter rosters.
//!
//! Users organize skills into categories, assign fighters to skills with
//! levels, create work items linked to skills and approve XP rewards that
//! feed back into levels. The engine in [`models`] and [`sync`] is pure and
//! synchronous; [`storage`] and [`config`] are the ambient plumbing around it.

pub mod board;
pub mod config;
pub mod export;
pub mod logging;
pub mod models;
pub mod storage;
pub mod sync;
pub mod undo;


/// Library-level error type for Skillforge operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: models::WorkItemStatus,
        to: models::WorkItemStatus,
    },

    #[error("Work item already approved: {0}")]
    AlreadyApproved(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Skillforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate version plus build metadata.
pub fn build_info() -> String {
    format!(
        "{} ({} {})",
        env!("CARGO_PKG_VERSION"),
        env!("SKILLFORGE_GIT_COMMIT"),
        env!("SKILLFORGE_BUILD_TIMESTAMP")
    )
}
