//! In-memory [`ProductStore`] used by tests and `mock` builds.
//!
//! Ids come from a counter starting at 1, like a fresh `SERIAL` column, and are
//! never reused. `set_available(false)` makes every call fail with
//! `StoreError::Unavailable`; `fail_on` does the same for one operation only,
//! so multi-step callers can be failed half way through.

use super::ProductStore;
use crate::error::StoreError;
use crate::model::{Product, ProductPatch};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Store operations that can be made to fail individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StoreOperation {
    ListAll,
    Insert,
    FetchById,
    Update,
    DeleteById,
    MergeUpdate,
}

#[derive(Default)]
struct Table {
    rows: BTreeMap<i32, Product>,
    last_id: i32,
}

pub struct MemoryProductStore {
    table: Mutex<Table>,
    offline: AtomicBool,
    failing: Mutex<BTreeSet<StoreOperation>>,
}

impl Default for MemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table::default()),
            offline: AtomicBool::new(false),
            failing: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    /// Make `operation` fail until [`recover`](Self::recover) is called.
    pub fn fail_on(&self, operation: StoreOperation) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(operation);
        }
    }

    pub fn recover(&self, operation: StoreOperation) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&operation);
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_table<T>(
        &self,
        operation: StoreOperation,
        f: impl FnOnce(&mut Table) -> T,
    ) -> Result<T, StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        let injected = self
            .failing
            .lock()
            .map(|failing| failing.contains(&operation))
            .unwrap_or(true);
        if injected {
            return Err(StoreError::Unavailable(format!("{operation:?} failed")));
        }
        let mut table = self
            .table
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(f(&mut table))
    }
}

impl ProductStore for MemoryProductStore {
    fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        self.with_table(StoreOperation::ListAll, |t| t.rows.values().cloned().collect())
    }

    fn insert(&self, name: &str, price: Decimal) -> Result<i32, StoreError> {
        self.with_table(StoreOperation::Insert, |t| {
            t.last_id += 1;
            let id = t.last_id;
            t.rows.insert(
                id,
                Product {
                    id,
                    name: name.to_string(),
                    price,
                },
            );
            id
        })
    }

    fn fetch_by_id(&self, id: i32) -> Result<Option<Product>, StoreError> {
        self.with_table(StoreOperation::FetchById, |t| t.rows.get(&id).cloned())
    }

    fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        self.with_table(StoreOperation::Update, |t| {
            t.rows.get_mut(&product.id).map(|row| {
                row.name = product.name.clone();
                row.price = product.price;
                row.clone()
            })
        })
    }

    fn delete_by_id(&self, id: i32) -> Result<u64, StoreError> {
        self.with_table(StoreOperation::DeleteById, |t| u64::from(t.rows.remove(&id).is_some()))
    }

    fn merge_update(&self, id: i32, patch: &ProductPatch) -> Result<Option<Product>, StoreError> {
        self.with_table(StoreOperation::MergeUpdate, |t| {
            t.rows.get_mut(&id).map(|row| {
                *row = patch.merge_into(row);
                row.clone()
            })
        })
    }
}
