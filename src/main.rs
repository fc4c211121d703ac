//! Replica Router - command line entry point.
//!
//! Connects a primary and a replica, runs one statement through the router
//! and prints the result as JSON.

use replica_router::config::Config;
use replica_router::db::{Connection, SqlxConnection};
use replica_router::models::{Binds, QueryResult};
use replica_router::routing::{ReplicaRouter, RoutingFlags};
use replica_router::ReplicaResult;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Logs go to stderr so stdout carries only the result.
    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

async fn run_statement(
    router: &mut ReplicaRouter<SqlxConnection, SqlxConnection>,
    config: &Config,
) -> ReplicaResult<QueryResult> {
    let binds = Binds::new();
    let name = config.name.as_deref();

    if config.force_primary {
        router
            .with_primary(async |router| router.select_all(&config.sql, name, &binds).await)
            .await
    } else {
        router.select_all(&config.sql, name, &binds).await
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    info!(
        routing = ?config.routing,
        force_primary = config.force_primary,
        "Starting replica router v{}",
        env!("CARGO_PKG_VERSION")
    );

    let primary_db = config.primary_config()?;
    let replica_db = config.replica_config()?;
    info!(
        primary_database = ?primary_db.database,
        replica_database = ?replica_db.database,
        "Parsed connection URLs"
    );
    let primary_config = primary_db.to_connection_config()?;
    let replica_config = replica_db.to_connection_config()?;

    let timeout = config.query_timeout_duration();
    let primary = SqlxConnection::connect(&primary_config, timeout).await?;
    let replica = SqlxConnection::connect(&replica_config, timeout).await?;

    let flags = Arc::new(RoutingFlags::new(&config.routing));
    let mut router = ReplicaRouter::new(primary, replica, flags);

    let result = run_statement(&mut router, &config).await;

    let (primary, replica) = router.into_parts();
    primary.close().await;
    replica.close().await;

    let result = result?;
    info!(
        rows = result.row_count(),
        execution_time_ms = result.execution_time_ms,
        "Statement finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
