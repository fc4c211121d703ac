//! Data models for the replica router.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigError, ConnectionRole, DatabaseType};
pub use query::{
    Binds, ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_STATEMENT_NAME, QueryParam,
    QueryResult, Record,
};
