//! # Stockroom
//!
//! Product catalog over PostgreSQL for the `may` coroutine runtime.
//!
//! Layers, leaf first:
//! - [`store`]: parameterized statements against the `products` table
//! - [`service`]: merge-on-update, not-found vs. failure, input validation
//! - [`http`]: `may_minihttp` adapter mapping outcomes to status codes

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod model;
pub mod service;
pub mod store;

pub use config::{AppConfig, DatabaseConfig, ServerConfig};
pub use error::{CatalogError, StoreError};
pub use executor::{PgExecutor, PgPool, SqlExecutor};
pub use model::{NewProduct, Product, ProductPatch};
pub use service::CatalogService;
pub use store::{PgProductStore, ProductStore};

#[cfg(any(test, feature = "mock"))]
pub use store::{MemoryProductStore, StoreOperation};
