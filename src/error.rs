//! Error types for the replica router.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Routing rejections (`TransactionAttempted`, `DepthUnderflow`, `NoOpenTransaction`)
//! signal programming errors in the caller. Every other variant describes a failure
//! reported by a connection and is passed through the routing layer untouched.

use crate::routing::TransactionOperation;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplicaError {
    #[error("Attempting to {operation} during a read-only database connection.")]
    TransactionAttempted { operation: TransactionOperation },

    #[error("Transaction depth underflow: cannot {operation} without an open transaction")]
    DepthUnderflow { operation: TransactionOperation },

    #[error("Cannot {operation} outside of a transaction")]
    NoOpenTransaction { operation: TransactionOperation },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {limit_secs}s")]
    Timeout { operation: String, limit_secs: u64 },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ReplicaError {
    /// Create a transaction-attempted error for a blocked operation.
    pub fn transaction_attempted(operation: TransactionOperation) -> Self {
        Self::TransactionAttempted { operation }
    }

    /// Create a depth underflow error.
    pub fn depth_underflow(operation: TransactionOperation) -> Self {
        Self::DepthUnderflow { operation }
    }

    /// Create an error for an operation that needs an open transaction.
    pub fn no_open_transaction(operation: TransactionOperation) -> Self {
        Self::NoOpenTransaction { operation }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error for an operation bounded by `limit_secs`.
    pub fn timeout(operation: impl Into<String>, limit_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_secs,
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::TransactionAttempted { .. } => {
                Some("Run transactional work inside with_primary or on the primary connection")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Errors raised by the routing layer itself. These indicate a bug in the
    /// caller and must never be retried.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::TransactionAttempted { .. }
                | Self::DepthUnderflow { .. }
                | Self::NoOpenTransaction { .. }
        )
    }
}

/// Driver failures become connection, database or internal errors. Pool
/// exhaustion is reported as a connection error.
impl From<sqlx::Error> for ReplicaError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;

        match err {
            E::Database(db_err) => Self::database(
                db_err.message(),
                db_err.code().map(|c| c.into_owned()),
                "Check the SQL syntax and referenced objects",
            ),
            E::RowNotFound => Self::database(
                "Statement returned no rows",
                None,
                "Verify the query conditions match existing data",
            ),
            E::Configuration(msg) => {
                Self::connection(msg.to_string(), "Check the connection URL and credentials")
            }
            E::PoolTimedOut => Self::connection(
                "Timed out waiting for a pooled connection",
                "Raise acquire_timeout or max_connections in the connection URL",
            ),
            E::PoolClosed => Self::connection("Connection pool is closed", "Reconnect the pool"),
            E::Io(io_err) => Self::connection(
                format!("I/O error: {io_err}"),
                "Check that the database server is reachable",
            ),
            E::Tls(tls_err) => Self::connection(
                format!("TLS error: {tls_err}"),
                "Verify the TLS settings of the connection URL",
            ),
            E::Protocol(msg) => Self::connection(
                format!("Protocol error: {msg}"),
                "Check that the server version is supported",
            ),
            E::AnyDriverError(driver_err) => Self::connection(
                format!("Driver error: {driver_err}"),
                "Check that the URL scheme names a supported backend",
            ),
            E::ColumnDecode { index, source } => {
                Self::internal(format!("Cannot decode column {index}: {source}"))
            }
            other => Self::internal(format!("Driver failure: {other}")),
        }
    }
}

/// Result type alias for routed database operations.
pub type ReplicaResult<T> = Result<T, ReplicaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_attempted_message_names_operation() {
        let err = ReplicaError::transaction_attempted(TransactionOperation::CreateSavepoint);
        assert_eq!(
            err.to_string(),
            "Attempting to create a savepoint during a read-only database connection."
        );

        let err = ReplicaError::transaction_attempted(TransactionOperation::BeginTransaction);
        assert!(err.to_string().contains("begin a transaction"));
    }

    #[test]
    fn test_depth_underflow_message() {
        let err = ReplicaError::depth_underflow(TransactionOperation::CommitTransaction);
        assert!(err.to_string().contains("underflow"));
        assert!(err.to_string().contains("commit a transaction"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = ReplicaError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
        assert!(ReplicaError::invalid_input("bad").suggestion().is_none());
    }

    #[test]
    fn test_error_retryable() {
        assert!(ReplicaError::timeout("query", 30).is_retryable());
        assert!(ReplicaError::connection("err", "sugg").is_retryable());
        assert!(
            !ReplicaError::transaction_attempted(TransactionOperation::ReleaseSavepoint)
                .is_retryable()
        );
    }

    #[test]
    fn test_programming_errors() {
        assert!(
            ReplicaError::transaction_attempted(TransactionOperation::BeginTransaction)
                .is_programming_error()
        );
        assert!(
            ReplicaError::depth_underflow(TransactionOperation::ReleaseSavepoint)
                .is_programming_error()
        );
        assert!(!ReplicaError::internal("boom").is_programming_error());
    }

    #[test]
    fn test_pool_closed_maps_to_connection() {
        let err: ReplicaError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, ReplicaError::Connection { .. }));
    }

    #[test]
    fn test_pool_timeout_does_not_invent_a_limit() {
        let err: ReplicaError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, ReplicaError::Connection { .. }));
        assert!(err.is_retryable());
        assert!(!err.to_string().contains("30"));
        assert!(err.suggestion().unwrap().contains("acquire_timeout"));
    }

    #[test]
    fn test_timeout_keeps_large_limits() {
        let limit = u64::from(u32::MAX) + 1;
        let err = ReplicaError::timeout("query execution", limit);
        assert!(matches!(err, ReplicaError::Timeout { limit_secs, .. } if limit_secs == limit));
        assert_eq!(
            err.to_string(),
            format!("Timeout: query execution exceeded {limit}s")
        );
    }
}
