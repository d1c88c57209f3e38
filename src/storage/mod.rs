//! Storage Layer - pooled, read-only access to the SQLite store
//!
//! The store holds three relations populated by an external ingestion
//! pipeline:
//! - metadata(study_id, ...free-form columns)
//! - annotations_terms(study_id, contrast_id, term, weight)
//! - coordinates(study_id, x, y, z)

pub mod pool;
pub mod provider;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

pub use pool::{CheckedManager, ConnectionPool, PoolOptions, PooledConnection};
pub use provider::{ConnectionProvider, DIALECT};
