//! Record store: the only code that knows about the `products` table.
//!
//! Outcomes are classified three ways: a value, an empty result (`Ok(None)`,
//! `Ok(vec![])`, `Ok(0)`), or a backend failure (`Err(StoreError)`). No
//! business rules live here.

mod postgres;

#[cfg(any(test, feature = "mock"))]
mod memory;

pub use postgres::PgProductStore;

#[cfg(any(test, feature = "mock"))]
pub use memory::{MemoryProductStore, StoreOperation};

use crate::error::StoreError;
use crate::model::{Product, ProductPatch};
use rust_decimal::Decimal;

/// Persistence operations over products.
pub trait ProductStore: Send + Sync {
    /// Every row, in backend order. An empty table is `Ok(vec![])`.
    fn list_all(&self) -> Result<Vec<Product>, StoreError>;

    /// Insert a row and return the generated id.
    fn insert(&self, name: &str, price: Decimal) -> Result<i32, StoreError>;

    /// Point lookup; `Ok(None)` when no row has this id.
    fn fetch_by_id(&self, id: i32) -> Result<Option<Product>, StoreError>;

    /// Overwrite name and price of `product.id`, returning the row as stored.
    /// `Ok(None)` when the id does not exist.
    fn update(&self, product: &Product) -> Result<Option<Product>, StoreError>;

    /// Delete by id and return how many rows went away (0 or 1).
    fn delete_by_id(&self, id: i32) -> Result<u64, StoreError>;

    /// Apply the merge rules of [`ProductPatch`] inside a single statement.
    /// `Ok(None)` when the id does not exist.
    fn merge_update(&self, id: i32, patch: &ProductPatch) -> Result<Option<Product>, StoreError>;
}
