//! The connection capability set.
//!
//! [`Connection`] is the interface every handle in the routing layer speaks:
//! the real sqlx-backed connection, the transaction guard wrapped around the
//! replica, and the router itself. Wrapping one `Connection` in another is how
//! routing and guarding are layered on top of a plain database client.

use crate::error::ReplicaResult;
use crate::models::{Binds, QueryResult, Record};
use serde_json::Value as JsonValue;
use std::future::Future;

/// Statement execution and transaction control for one database session.
///
/// Only [`select_all`](Connection::select_all) and the transaction methods are
/// required. The other read shapes are derived from `select_all` by default;
/// wrappers override them so that every shape reaches the wrapped handle
/// unchanged.
///
/// `name` is a human readable label for logging. It never changes what the
/// statement does.
pub trait Connection: Send {
    /// Execute a statement and return rows with column metadata.
    fn select_all(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<QueryResult>> + Send;

    /// Execute a statement and return every row as a record.
    fn select(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<Vec<Record>>> + Send {
        async move { Ok(self.select_all(sql, name, binds).await?.into_records()) }
    }

    /// Execute a statement and return the first row, if any.
    fn select_one(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<Option<Record>>> + Send {
        async move {
            Ok(self
                .select_all(sql, name, binds)
                .await?
                .into_records()
                .into_iter()
                .next())
        }
    }

    /// Execute a statement and return rows as arrays of values.
    fn select_rows(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<Vec<Vec<JsonValue>>>> + Send {
        async move { Ok(self.select_all(sql, name, binds).await?.rows) }
    }

    /// Execute a statement and return the first column of the first row.
    fn select_value(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<Option<JsonValue>>> + Send {
        async move { Ok(self.select_all(sql, name, binds).await?.into_first_value()) }
    }

    /// Execute a statement and return the first column of every row.
    fn select_values(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> impl Future<Output = ReplicaResult<Vec<JsonValue>>> + Send {
        async move { Ok(self.select_all(sql, name, binds).await?.into_first_column()) }
    }

    /// Open a transaction, or a nested transaction when one is already open.
    fn begin_transaction(&mut self) -> impl Future<Output = ReplicaResult<()>> + Send;

    /// Commit the innermost open transaction.
    fn commit_transaction(&mut self) -> impl Future<Output = ReplicaResult<()>> + Send;

    /// Roll back the innermost open transaction.
    fn rollback_transaction(&mut self) -> impl Future<Output = ReplicaResult<()>> + Send;

    fn create_savepoint(&mut self, name: &str) -> impl Future<Output = ReplicaResult<()>> + Send;

    fn rollback_to_savepoint(
        &mut self,
        name: &str,
    ) -> impl Future<Output = ReplicaResult<()>> + Send;

    fn release_savepoint(&mut self, name: &str) -> impl Future<Output = ReplicaResult<()>> + Send;

    /// Number of transactions and savepoints currently open on this handle.
    fn open_transactions(&self) -> u32;
}
