//! Error types for the record store and the catalog service.
//!
//! The store has a single failure class: the backend could not be reached or
//! could not run the statement. "No such product" is never an error; it is
//! reported structurally as `Ok(None)` / `Ok(false)` by the callers.

use may_postgres::Error as PostgresError;
use std::fmt;

/// Failure reaching or querying the backend.
///
/// There is a single failure class, `BackendUnavailable`: callers never branch
/// on the variant. The variants only keep the underlying cause around for logs.
#[derive(Debug)]
pub enum StoreError {
    /// `PostgreSQL` error from `may_postgres` (connection, statement, constraint)
    PostgresError(PostgresError),
    /// A returned row did not have the expected shape
    RowDecode(String),
    /// Connection could not be established or the pool is empty
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::PostgresError(e) => write!(f, "Backend unavailable: PostgreSQL error: {e}"),
            StoreError::RowDecode(s) => write!(f, "Backend unavailable: row decode error: {s}"),
            StoreError::Unavailable(s) => write!(f, "Backend unavailable: {s}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::PostgresError(err)
    }
}

/// Errors surfaced by [`CatalogService`](crate::service::CatalogService).
#[derive(Debug)]
pub enum CatalogError {
    /// Store failure, passed through unchanged
    BackendUnavailable(StoreError),
    /// Candidate or patch rejected before touching the store
    InvalidInput(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::BackendUnavailable(e) => write!(f, "{e}"),
            CatalogError::InvalidInput(s) => write!(f, "Invalid input: {s}"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::BackendUnavailable(e) => Some(e),
            CatalogError::InvalidInput(_) => None,
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        CatalogError::BackendUnavailable(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("pool is empty".to_string());
        assert!(err.to_string().contains("Backend unavailable"));
        assert!(err.to_string().contains("pool is empty"));

        let err = StoreError::RowDecode("column price".to_string());
        assert!(err.to_string().contains("row decode error"));
    }

    #[test]
    fn test_every_store_error_maps_to_backend_unavailable() {
        for err in [
            StoreError::Unavailable("x".to_string()),
            StoreError::RowDecode("x".to_string()),
        ] {
            assert!(matches!(CatalogError::from(err), CatalogError::BackendUnavailable(_)));
        }
    }

    #[test]
    fn test_catalog_error_wraps_store_error_unchanged() {
        let err: CatalogError = StoreError::Unavailable("connection reset".to_string()).into();
        match &err {
            CatalogError::BackendUnavailable(StoreError::Unavailable(msg)) => {
                assert_eq!(msg, "connection reset");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.to_string(), "Backend unavailable: connection reset");
    }

    #[test]
    fn test_invalid_input_display() {
        let err = CatalogError::InvalidInput("name must not be empty".to_string());
        assert_eq!(err.to_string(), "Invalid input: name must not be empty");
        assert!(std::error::Error::source(&err).is_none());
    }
}
