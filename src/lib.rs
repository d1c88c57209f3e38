//! # Neurodiss - dissociation queries over neuroimaging study data
//!
//! A small read-only HTTP service over a relational store of study metadata,
//! term annotations and 3-D activation coordinates.
//!
//! Neurodiss provides:
//! - Term dissociation (studies with term A but not term B), exact match with
//!   substring fallback
//! - Spatial dissociation over coordinates, by exact voxel or by proximity
//! - Batched materialization of study identifiers into metadata records
//! - A best-effort diagnostic report of the backing store
//! - A lazily initialized, validating SQLite connection pool

pub mod config;
pub mod location;
pub mod storage;
pub mod query;
pub mod server;
pub mod ui;

// Re-exports for convenient access
pub use location::Location;
pub use storage::{ConnectionPool, ConnectionProvider, PoolOptions};
pub use query::{MatchType, SpatialResolver, TermResolver};

/// Result type alias for Neurodiss operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Neurodiss operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Task error: {0}")]
    Task(String),
}

impl Error {
    /// Whether the failure was caused by the caller's input rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}
