//! Persistence contexts: scoped handles to the relational store.
//!
//! A [`DbContext`] is checked out of an r2d2 pool and returned to it when
//! dropped, so every exit path of a repository operation releases it.

mod registry;

use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;

use crate::errors::RepositoryError;

pub use registry::{ContextFactory, ContextRegistry, PoolContextFactory};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbContext = PooledConnection<ConnectionManager<SqliteConnection>>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    busy_timeout: Duration,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Builds a connection pool for `database_url`.
///
/// Connections never expire, so a `:memory:` database with `max_size = 1`
/// keeps its contents for the lifetime of the pool.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool, RepositoryError> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(max_size)
        .max_lifetime(None)
        .idle_timeout(None)
        .test_on_check_out(true)
        .connection_customizer(Box::new(ConnectionOptions { busy_timeout: BUSY_TIMEOUT }))
        .build(manager)
        .map_err(|e| RepositoryError::Context(e.to_string()))?;

    tracing::info!(database_url, max_size, "database connection pool created");
    Ok(pool)
}

/// Runs an idempotent DDL script against the pool.
pub fn apply_schema(pool: &DbPool, sql: &str) -> Result<(), RepositoryError> {
    let mut conn = pool.get().map_err(|e| RepositoryError::Context(e.to_string()))?;
    conn.batch_execute(sql)
        .map_err(RepositoryError::storage("schema", "apply_schema"))?;
    tracing::debug!("database schema applied");
    Ok(())
}
