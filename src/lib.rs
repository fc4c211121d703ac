//! Replica Router Library
//!
//! Transparent read/write splitting for a primary/replica database pair.
//! A [`ReplicaRouter`] sends read statements to the replica unless the
//! session is forced to the primary or has an open transaction, and a
//! [`TransactionGuard`] keeps transactional work off the replica.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routing;

pub use config::{Config, RoutingConfig};
pub use db::{Connection, SqlxConnection};
pub use error::{ReplicaError, ReplicaResult};
pub use routing::{PrimaryScope, ReplicaRouter, RoutingFlags, TransactionGuard};
