//! Database access.
//!
//! - `connection`: the [`Connection`] trait every handle implements
//! - `pool`: sqlx-backed connections for PostgreSQL, MySQL and SQLite
//! - `params`: parameter binding
//! - `types`: row decoding to JSON

pub mod connection;
pub mod params;
pub mod pool;
pub mod types;

pub use connection::Connection;
pub use pool::SqlxConnection;
