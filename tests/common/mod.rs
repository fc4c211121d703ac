//! Shared test helpers: a recording in-memory connection.

#![allow(dead_code)]

use replica_router::db::Connection;
use replica_router::error::{ReplicaError, ReplicaResult};
use replica_router::models::{Binds, QueryResult, Record};
use replica_router::routing::{Role, current_role};
use serde_json::{Value as JsonValue, json};
use std::sync::{Arc, Mutex};

/// One call observed by a [`FakeConnection`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: &'static str,
    pub method: &'static str,
    pub sql: Option<String>,
    pub name: Option<String>,
    pub binds: Option<Binds>,
    /// Role of the task at the time of the call.
    pub role: Role,
}

/// Call log shared by every fake in one test, in call order.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no calls recorded")
    }

    /// `(target, method)` pairs in order.
    pub fn summary(&self) -> Vec<(&'static str, &'static str)> {
        self.calls().iter().map(|c| (c.target, c.method)).collect()
    }
}

/// In-memory [`Connection`] that records every call and returns canned rows.
pub struct FakeConnection {
    target: &'static str,
    log: CallLog,
    result: QueryResult,
    failure: Option<String>,
    abandons_on_failure: bool,
    depth: u32,
}

impl FakeConnection {
    pub fn new(target: &'static str, log: &CallLog) -> Self {
        Self {
            target,
            log: log.clone(),
            result: QueryResult::from_rows(&["source"], vec![vec![json!(target)]]),
            failure: None,
            abandons_on_failure: false,
            depth: 0,
        }
    }

    pub fn primary(log: &CallLog) -> Self {
        Self::new("primary", log)
    }

    pub fn replica(log: &CallLog) -> Self {
        Self::new("replica", log)
    }

    pub fn returning(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// Make every call fail with a database error carrying `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Start failing every call from now on.
    pub fn set_failure(&mut self, message: &str) {
        self.failure = Some(message.to_string());
    }

    /// A failed close still ends the level, like a driver commit that errors.
    pub fn abandoning_on_failure(mut self) -> Self {
        self.abandons_on_failure = true;
        self
    }

    fn record(
        &self,
        method: &'static str,
        sql: Option<&str>,
        name: Option<&str>,
        binds: Option<&Binds>,
    ) -> ReplicaResult<()> {
        self.log.push(Call {
            target: self.target,
            method,
            sql: sql.map(String::from),
            name: name.map(String::from),
            binds: binds.cloned(),
            role: current_role(),
        });
        match &self.failure {
            Some(message) => Err(ReplicaError::database(message.clone(), None, "fake failure")),
            None => Ok(()),
        }
    }

    fn read(
        &self,
        method: &'static str,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<QueryResult> {
        self.record(method, Some(sql), name, Some(binds))?;
        Ok(self.result.clone())
    }

    fn open(&mut self, method: &'static str, name: Option<&str>) -> ReplicaResult<()> {
        self.record(method, None, name, None)?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self, method: &'static str, name: Option<&str>) -> ReplicaResult<()> {
        if let Err(err) = self.record(method, None, name, None) {
            if self.abandons_on_failure {
                self.depth = self.depth.saturating_sub(1);
            }
            return Err(err);
        }
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| ReplicaError::internal(format!("{} closed too many levels", self.target)))?;
        Ok(())
    }
}

impl Connection for FakeConnection {
    async fn select_all(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<QueryResult> {
        self.read("select_all", sql, name, binds)
    }

    async fn select(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Record>> {
        Ok(self.read("select", sql, name, binds)?.into_records())
    }

    async fn select_one(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<Record>> {
        Ok(self
            .read("select_one", sql, name, binds)?
            .into_records()
            .into_iter()
            .next())
    }

    async fn select_rows(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<Vec<JsonValue>>> {
        Ok(self.read("select_rows", sql, name, binds)?.rows)
    }

    async fn select_value(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Option<JsonValue>> {
        Ok(self.read("select_value", sql, name, binds)?.into_first_value())
    }

    async fn select_values(
        &mut self,
        sql: &str,
        name: Option<&str>,
        binds: &Binds,
    ) -> ReplicaResult<Vec<JsonValue>> {
        Ok(self.read("select_values", sql, name, binds)?.into_first_column())
    }

    async fn begin_transaction(&mut self) -> ReplicaResult<()> {
        self.open("begin_transaction", None)
    }

    async fn commit_transaction(&mut self) -> ReplicaResult<()> {
        self.close("commit_transaction", None)
    }

    async fn rollback_transaction(&mut self) -> ReplicaResult<()> {
        self.close("rollback_transaction", None)
    }

    async fn create_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        self.open("create_savepoint", Some(name))
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        self.close("rollback_to_savepoint", Some(name))
    }

    async fn release_savepoint(&mut self, name: &str) -> ReplicaResult<()> {
        self.close("release_savepoint", Some(name))
    }

    fn open_transactions(&self) -> u32 {
        self.depth
    }
}
