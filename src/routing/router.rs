//! Statement router.
//!
//! [`ReplicaRouter`] owns one session's primary and replica handles and
//! implements [`Connection`] itself, so application code uses it exactly like
//! a plain connection. Every read shape is routed:
//!
//! - forced primary, or an open transaction on the primary (unless open
//!   transactions are ignored): delegate unchanged to the primary;
//! - otherwise: relabel the statement as `"Replica: <name>"` and run it on the
//!   replica inside the reading role, returning the replica's result as is.
//!
//! Errors from either side propagate unchanged. A failed replica read is not
//! retried on the primary.
//!
//! Transaction boundary calls go to the connection of the current role. The
//! replica is always wrapped in a [`TransactionGuard`], so transactional work
//! attempted from inside a reading scope hits the guard.
//!
//! The open-transaction check always looks at the primary, the connection
//! reads are redirected to. A transaction the guard let through on the
//! replica keeps its reads on the replica, since that is the default path.

use crate::db::Connection;
use crate::error::ReplicaResult;
use crate::models::{Binds, DEFAULT_STATEMENT_NAME, QueryResult, Record};
use crate::routing::guard::TransactionGuard;
use crate::routing::role::{self, Role};
use crate::routing::scope::{PrimaryScope, ScopedRouting};
use crate::routing::state::{RoutingDecision, RoutingFlags, RoutingState};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, trace};

/// Label attached to statements served by the replica.
pub fn replica_label(name: Option<&str>) -> String {
    format!("Replica: {}", name.unwrap_or(DEFAULT_STATEMENT_NAME))
}

/// Route one read statement. Expands inside an `async fn` taking
/// `(&mut self, sql, name, binds)`.
macro_rules! route_select {
    ($self:ident, $method:ident, $sql:ident, $name:ident, $binds:ident) => {{
        let decision = $self.routing_decision();
        if decision.use_primary {
            trace!(
                sql = %$sql,
                binds = $binds.len(),
                reason = %decision.reason,
                method = stringify!($method),
                "Routing statement to primary"
            );
            $self.primary.$method($sql, $name, $binds).await
        } else {
            let label = replica_label($name);
            debug!(
                sql = %$sql,
                name = %label,
                binds = $binds.len(),
                method = stringify!($method),
                "Routing statement to replica"
            );
            if role::current_role() == Role::Reading {
                $self.replica.$method($sql, Some(label.as_str()), $binds).await
            } else {
                role::connected_to(
                    Role::Reading,
                    $self.replica.$method($sql, Some(label.as_str()), $binds),
                )
                .await
            }
        }
    }};
}

/// Send a transaction boundary call to the connection of the current role.
macro_rules! route_transaction {
    ($self:ident, $method:ident $(, $arg:ident)?) => {{
        if role::current_role() == Role::Reading {
            $self.replica.$method($($arg)?).await
        } else {
            $self.primary.$method($($arg)?).await
        }
    }};
}

/// Read/write router for one session's primary/replica pair.
pub struct ReplicaRouter<P, R> {
    primary: P,
    replica: TransactionGuard<R>,
    state: RoutingState,
}

impl<P: Connection, R: Connection> ReplicaRouter<P, R> {
    pub fn new(primary: P, replica: R, flags: Arc<RoutingFlags>) -> Self {
        Self {
            primary,
            replica: TransactionGuard::new(replica, flags.clone()),
            state: RoutingState::new(flags),
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    /// The guarded replica handle.
    pub fn replica(&self) -> &TransactionGuard<R> {
        &self.replica
    }

    pub fn replica_mut(&mut self) -> &mut TransactionGuard<R> {
        &mut self.replica
    }

    pub fn flags(&self) -> &Arc<RoutingFlags> {
        self.state.flags()
    }

    pub fn is_forced_to_primary(&self) -> bool {
        self.state.is_forced_to_primary()
    }

    /// Where a read statement issued right now would go, and why.
    pub fn routing_decision(&self) -> RoutingDecision {
        self.state.decide(self.primary.open_transactions())
    }

    /// Force primary routing until the returned scope is dropped.
    ///
    /// The scope derefs to the router, so statements are issued through it:
    ///
    /// ```ignore
    /// let mut primary = router.primary_scope();
    /// let fresh = primary.select_value("SELECT balance FROM accounts WHERE id = $1", None, &binds).await?;
    /// ```
    pub fn primary_scope(&mut self) -> PrimaryScope<'_, Self> {
        PrimaryScope::new(self)
    }

    /// Run `body` with primary routing forced, restoring the previous setting
    /// afterwards on every exit path.
    pub async fn with_primary<T>(&mut self, body: impl AsyncFnOnce(&mut Self) -> T) -> T {
        let mut scope = self.primary_scope();
        body(&mut *scope).await
    }

    /// Give back the underlying handles.
    pub fn into_parts(self) -> (P, R) {
        (self.primary, self.replica.into_inner())
    }
}

impl<P, R> ScopedRouting for ReplicaRouter<P, R> {
    fn routing_state(&self) -> &RoutingState {
        &self.state
    }

    fn routing_state_mut(&mut self) -> &mut RoutingState {
        &mut self.state
    }
}

impl<P: Connection, R: Connection> Connection for ReplicaRouter<P, R> {
    async fn select_all(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<QueryResult> {
        route_select!(self, select_all, sql, name, binds)
    }

    async fn select(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Record>> {
        route_select!(self, select, sql, name, binds)
    }

    async fn select_one(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<Record>> {
        route_select!(self, select_one, sql, name, binds)
    }

    async fn select_rows(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Vec<JsonValue>>> {
        route_select!(self, select_rows, sql, name, binds)
    }

    async fn select_value(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<JsonValue>> {
        route_select!(self, select_value, sql, name, binds)
    }

    async fn select_values(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<JsonValue>> {
        route_select!(self, select_values, sql, name, binds)
    }

    async fn begin_transaction(&mut self) -> ReplicaResult<()> {
        route_transaction!(self, begin_transaction)
    }

    async fn commit_transaction(&mut self) -> ReplicaResult<()> {
        route_transaction!(self, commit_transaction)
    }

    async fn rollback_transaction(&mut self) -> ReplicaResult<()> {
        route_transaction!(self, rollback_transaction)
    }

    async fn create_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        route_transaction!(self, create_savepoint, name)
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        route_transaction!(self, rollback_to_savepoint, name)
    }

    async fn release_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        route_transaction!(self, release_savepoint, name)
    }

    fn open_transactions(&self) -> u32 {
        if role::current_role() == Role::Reading {
            self.replica.open_transactions()
        } else {
            self.primary.open_transactions()
        }
    }
}
