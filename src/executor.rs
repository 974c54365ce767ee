//! `SqlExecutor` and its `may_postgres` implementations.
//!
//! The record store talks to the backend only through [`SqlExecutor`], so it
//! works the same over a single client ([`PgExecutor`]) or the shared pool
//! ([`PgPool`]).

use crate::connection::{check_connection_health, connect};
use crate::error::StoreError;
use may_postgres::types::ToSql;
use may_postgres::{Client, Row};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Trait for executing parameterized statements
///
/// Values are always bound through `params` (`$1`, `$2`, ...); implementations
/// never splice them into the SQL text.
pub trait SqlExecutor: Send + Sync {
    /// Execute a statement and return the number of rows affected
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, StoreError>;

    /// Execute a query that must return exactly one row
    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, StoreError>;

    /// Execute a query and return all rows
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, StoreError>;
}

/// Executor over a single `may_postgres::Client`.
pub struct PgExecutor {
    client: Client,
}

impl PgExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect and wrap the resulting client.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        Ok(Self::new(connect(url)?))
    }

    /// Check if the underlying connection answers `SELECT 1`
    pub fn check_health(&self) -> Result<bool, StoreError> {
        check_connection_health(&self.client)
    }

    fn timed<T>(
        &self,
        query: &str,
        run: impl FnOnce(&Client) -> Result<T, may_postgres::Error>,
    ) -> Result<T, StoreError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(query).entered();

        let start = Instant::now();
        let result = run(&self.client).map_err(|e| {
            #[cfg(feature = "metrics")]
            METRICS.record_query_error();
            log::warn!("statement failed: {e}");
            StoreError::PostgresError(e)
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);
        log::trace!("{} finished in {duration:?}", first_keyword(query));

        result
    }
}

impl SqlExecutor for PgExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, StoreError> {
        self.timed(query, |client| client.execute(query, params))
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, StoreError> {
        self.timed(query, |client| client.query_one(query, params))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, StoreError> {
        self.timed(query, |client| client.query(query, params))
    }
}

/// Fixed-size set of connections shared by every request, picked round-robin.
///
/// Built once at startup and dropped at shutdown; there is no process-wide
/// handle.
pub struct PgPool {
    executors: Vec<PgExecutor>,
    next: AtomicUsize,
}

impl PgPool {
    /// Open `size` connections (at least one) and health-check each of them.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` as soon as one connection cannot be opened or does
    /// not answer `SELECT 1`. Connections opened so far are closed on return.
    pub fn connect(url: &str, size: usize) -> Result<Self, StoreError> {
        let size = size.max(1);
        let mut executors = Vec::with_capacity(size);
        for slot in 0..size {
            let executor = PgExecutor::connect(url)?;
            if !executor.check_health()? {
                return Err(StoreError::Unavailable(format!(
                    "connection {slot} failed its health check"
                )));
            }
            executors.push(executor);
        }
        log::info!("connection pool ready with {size} connections");
        Ok(Self::from_executors(executors))
    }

    pub fn from_executors(executors: Vec<PgExecutor>) -> Self {
        Self {
            executors,
            next: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.executors.len()
    }

    fn pick(&self) -> Result<&PgExecutor, StoreError> {
        if self.executors.is_empty() {
            return Err(StoreError::Unavailable("connection pool is empty".to_string()));
        }
        let index = next_slot(&self.next, self.executors.len());
        Ok(&self.executors[index])
    }
}

impl SqlExecutor for PgPool {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, StoreError> {
        self.pick()?.execute(query, params)
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, StoreError> {
        self.pick()?.query_one(query, params)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, StoreError> {
        self.pick()?.query_all(query, params)
    }
}

fn next_slot(counter: &AtomicUsize, len: usize) -> usize {
    counter.fetch_add(1, Ordering::Relaxed) % len
}

fn first_keyword(query: &str) -> &str {
    query.split_whitespace().next().unwrap_or("")
}
