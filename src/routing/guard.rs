//! Transaction guard for read-only connections.
//!
//! [`TransactionGuard`] wraps a connection that must never run transactional
//! work (in practice the replica). It intercepts the transaction boundary
//! operations and, depending on the process-wide [`RoutingFlags`], either
//! skips them, forwards them while tracking nesting depth, or rejects them
//! with [`ReplicaError::TransactionAttempted`].
//!
//! Statement calls pass through untouched.

use crate::db::Connection;
use crate::error::{ReplicaError, ReplicaResult};
use crate::models::{Binds, QueryResult, Record};
use crate::routing::state::RoutingFlags;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

/// A transaction boundary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionOperation {
    BeginTransaction,
    CommitTransaction,
    RollbackTransaction,
    CreateSavepoint,
    RollbackToSavepoint,
    ReleaseSavepoint,
}

impl TransactionOperation {
    /// Human readable description used in error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::BeginTransaction => "begin a transaction",
            Self::CommitTransaction => "commit a transaction",
            Self::RollbackTransaction => "rollback a transaction",
            Self::CreateSavepoint => "create a savepoint",
            Self::RollbackToSavepoint => "rollback a savepoint",
            Self::ReleaseSavepoint => "release a savepoint",
        }
    }

    /// Whether the operation can change data and is therefore blockable.
    /// Rolling back a whole transaction only discards work.
    pub fn is_blockable(&self) -> bool {
        !matches!(self, Self::RollbackTransaction)
    }

    /// Whether the operation opens a nesting level (as opposed to closing one).
    pub fn opens_level(&self) -> bool {
        matches!(self, Self::BeginTransaction | Self::CreateSavepoint)
    }
}

impl std::fmt::Display for TransactionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Transaction and savepoint nesting depth of one connection.
///
/// Never negative: closing a level that was never opened is an error, not a
/// clamp to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionDepth(u32);

impl TransactionDepth {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_idle(&self) -> bool {
        self.0 == 0
    }

    pub fn increment(&mut self) {
        self.0 += 1;
    }

    /// Close one level.
    pub fn decrement(&mut self, operation: TransactionOperation) -> ReplicaResult<()> {
        self.0 = self
            .0
            .checked_sub(1)
            .ok_or_else(|| ReplicaError::depth_underflow(operation))?;
        Ok(())
    }

    /// Check that `operation` is legal at the current depth without changing it.
    fn check(&self, operation: TransactionOperation) -> ReplicaResult<()> {
        match operation {
            TransactionOperation::BeginTransaction => Ok(()),
            TransactionOperation::CreateSavepoint if self.is_idle() => {
                Err(ReplicaError::no_open_transaction(operation))
            }
            TransactionOperation::CreateSavepoint => Ok(()),
            _ if self.is_idle() => Err(ReplicaError::depth_underflow(operation)),
            _ => Ok(()),
        }
    }
}

/// What the guard decided to do with a transaction operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Guard is bypassed: return without delegating.
    Skip,
    /// Forward to the wrapped connection and track depth.
    Delegate,
}

/// Decorator that protects a connection from transactional work.
///
/// Depth is only tracked for operations that were actually forwarded. While
/// the guard is skipped nothing reaches the wrapped connection, so nothing is
/// counted either.
pub struct TransactionGuard<C> {
    inner: C,
    flags: Arc<RoutingFlags>,
    depth: TransactionDepth,
}

impl<C: Connection> TransactionGuard<C> {
    pub fn new(inner: C, flags: Arc<RoutingFlags>) -> Self {
        Self {
            inner,
            flags,
            depth: TransactionDepth::new(),
        }
    }

    pub fn depth(&self) -> TransactionDepth {
        self.depth
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn admit(&self, operation: TransactionOperation) -> ReplicaResult<Admission> {
        if self.flags.guard_skipped() {
            debug!(operation = %operation, "Transaction guard skipped");
            return Ok(Admission::Skip);
        }
        if operation.is_blockable() && self.flags.transactions_blocked() {
            warn!(
                operation = %operation,
                depth = self.depth.get(),
                "Blocked transaction operation on read-only connection"
            );
            return Err(ReplicaError::transaction_attempted(operation));
        }
        self.depth.check(operation)?;
        Ok(Admission::Delegate)
    }

    fn record(&mut self, operation: TransactionOperation) -> ReplicaResult<()> {
        if operation.opens_level() {
            self.depth.increment();
        } else {
            self.depth.decrement(operation)?;
        }
        debug!(operation = %operation, depth = self.depth.get(), "Transaction operation forwarded");
        Ok(())
    }

    /// Apply the outcome of a forwarded operation to the tracked depth.
    ///
    /// A failed close may still have ended the level on the wrapped
    /// connection (a driver commit that errors discards the transaction), so
    /// the guard follows the wrapped connection down in that case.
    fn settle(
        &mut self,
        operation: TransactionOperation,
        result: ReplicaResult<()>,
    ) -> ReplicaResult<()> {
        match result {
            Ok(()) => self.record(operation),
            Err(err) => {
                if !operation.opens_level() && self.inner.open_transactions() < self.depth.get() {
                    self.depth.decrement(operation)?;
                    warn!(
                        operation = %operation,
                        depth = self.depth.get(),
                        error = %err,
                        "Transaction level closed by a failed operation"
                    );
                }
                Err(err)
            }
        }
    }
}

impl<C: Connection> Connection for TransactionGuard<C> {
    async fn select_all(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<QueryResult> {
        self.inner.select_all(sql, name, binds).await
    }

    async fn select(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Record>> {
        self.inner.select(sql, name, binds).await
    }

    async fn select_one(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<Record>> {
        self.inner.select_one(sql, name, binds).await
    }

    async fn select_rows(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Vec<JsonValue>>> {
        self.inner.select_rows(sql, name, binds).await
    }

    async fn select_value(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<JsonValue>> {
        self.inner.select_value(sql, name, binds).await
    }

    async fn select_values(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<JsonValue>> {
        self.inner.select_values(sql, name, binds).await
    }

    async fn begin_transaction(&mut self) -> ReplicaResult<()> {
        let operation = TransactionOperation::BeginTransaction;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.begin_transaction().await;
        self.settle(operation, result)
    }

    async fn commit_transaction(&mut self) -> ReplicaResult<()> {
        let operation = TransactionOperation::CommitTransaction;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.commit_transaction().await;
        self.settle(operation, result)
    }

    async fn rollback_transaction(&mut self) -> ReplicaResult<()> {
        let operation = TransactionOperation::RollbackTransaction;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.rollback_transaction().await;
        self.settle(operation, result)
    }

    async fn create_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        let operation = TransactionOperation::CreateSavepoint;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.create_savepoint(name).await;
        self.settle(operation, result)
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        let operation = TransactionOperation::RollbackToSavepoint;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.rollback_to_savepoint(name).await;
        self.settle(operation, result)
    }

    async fn release_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        let operation = TransactionOperation::ReleaseSavepoint;
        if self.admit(operation)? == Admission::Skip {
            return Ok(());
        }
        let result = self.inner.release_savepoint(name).await;
        self.settle(operation, result)
    }

    fn open_transactions(&self) -> u32 {
        self.depth.get()
    }
}
