use super::ProductStore;
use crate::error::StoreError;
use crate::executor::SqlExecutor;
use crate::model::{Product, ProductPatch};
use may_postgres::Row;
use rust_decimal::Decimal;

const SELECT_ALL: &str = "SELECT id, name, price FROM products";

const SELECT_BY_ID: &str = "SELECT id, name, price FROM products WHERE id = $1";

const INSERT: &str = "INSERT INTO products (name, price) VALUES ($1, $2) RETURNING id";

const UPDATE: &str =
    "UPDATE products SET name = $1, price = $2 WHERE id = $3 RETURNING id, name, price";

// Empty name and zero price mean "keep the stored value", same as ProductPatch::merge_into.
const MERGE_UPDATE: &str = "UPDATE products \
     SET name = COALESCE(NULLIF($1::text, ''), name), \
         price = COALESCE(NULLIF($2::numeric, 0), price) \
     WHERE id = $3 RETURNING id, name, price";

const DELETE_BY_ID: &str = "DELETE FROM products WHERE id = $1";

/// [`ProductStore`] backed by PostgreSQL through any [`SqlExecutor`].
pub struct PgProductStore<E> {
    executor: E,
}

impl<E: SqlExecutor> PgProductStore<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    fn query_opt(
        &self,
        query: &str,
        params: &[&dyn may_postgres::types::ToSql],
    ) -> Result<Option<Product>, StoreError> {
        self.executor
            .query_all(query, params)?
            .first()
            .map(product_from_row)
            .transpose()
    }
}

impl<E: SqlExecutor> ProductStore for PgProductStore<E> {
    fn list_all(&self) -> Result<Vec<Product>, StoreError> {
        self.executor
            .query_all(SELECT_ALL, &[])?
            .iter()
            .map(product_from_row)
            .collect()
    }

    fn insert(&self, name: &str, price: Decimal) -> Result<i32, StoreError> {
        let row = self.executor.query_one(INSERT, &[&name, &price])?;
        row.try_get("id")
            .map_err(|e| StoreError::RowDecode(format!("id: {e}")))
    }

    fn fetch_by_id(&self, id: i32) -> Result<Option<Product>, StoreError> {
        self.query_opt(SELECT_BY_ID, &[&id])
    }

    fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
        self.query_opt(UPDATE, &[&product.name, &product.price, &product.id])
    }

    fn delete_by_id(&self, id: i32) -> Result<u64, StoreError> {
        self.executor.execute(DELETE_BY_ID, &[&id])
    }

    fn merge_update(&self, id: i32, patch: &ProductPatch) -> Result<Option<Product>, StoreError> {
        let name = patch.name.as_deref();
        self.query_opt(MERGE_UPDATE, &[&name, &patch.price, &id])
    }
}

/// Maps the `(id, name, price)` columns onto a [`Product`].
fn product_from_row(row: &Row) -> Result<Product, StoreError> {
    Ok(Product {
        id: row
            .try_get("id")
            .map_err(|e| StoreError::RowDecode(format!("id: {e}")))?,
        name: row
            .try_get("name")
            .map_err(|e| StoreError::RowDecode(format!("name: {e}")))?,
        price: row
            .try_get("price")
            .map_err(|e| StoreError::RowDecode(format!("price: {e}")))?,
    })
}
