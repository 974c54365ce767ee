//! Catalog service: product operations independent of the transport.
//!
//! Not-found is reported as `Ok(None)` / `Ok(false)`. Store failures are passed
//! through unchanged as [`CatalogError::BackendUnavailable`]; the only error the
//! service adds itself is [`CatalogError::InvalidInput`].

use crate::error::CatalogError;
use crate::model::{NewProduct, Product, ProductPatch};
use crate::store::ProductStore;
use rust_decimal::Decimal;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Product operations over any [`ProductStore`].
///
/// Cloning is cheap: clones share the same store, so one service can be
/// handed to every connection of the HTTP server.
///
/// # Examples
///
/// ```rust,ignore
/// use rust_decimal::Decimal;
/// use stockroom::{CatalogService, MemoryProductStore, NewProduct, ProductPatch};
///
/// let catalog = CatalogService::new(MemoryProductStore::new());
/// let widget = catalog.create_product(NewProduct::new("Widget", Decimal::new(999, 2)))?;
///
/// // An empty name leaves the stored name alone.
/// let patch = ProductPatch::new(Some(String::new()), Some(Decimal::new(1250, 2)));
/// let updated = catalog.update_product(widget.id, patch)?.expect("row exists");
/// assert_eq!(updated.name, "Widget");
/// ```
pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S> Clone for CatalogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ProductStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every product, in backend order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BackendUnavailable` if the store fails.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        let products = self.store.list_all()?;
        log::debug!("listed {} products", products.len());
        Ok(products)
    }

    /// Insert `candidate` and return it with the id assigned by the backend.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` for a blank name or a negative
    /// price (nothing is written), and `CatalogError::BackendUnavailable` if
    /// the insert fails.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn create_product(&self, candidate: NewProduct) -> Result<Product, CatalogError> {
        validate_new_product(&candidate)?;
        let id = self.store.insert(&candidate.name, candidate.price)?;
        log::debug!("created product {id}");
        Ok(candidate.with_id(id))
    }

    /// `Ok(None)` when no product has this id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BackendUnavailable` if the lookup fails.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn get_product(&self, id: i32) -> Result<Option<Product>, CatalogError> {
        Ok(self.store.fetch_by_id(id)?)
    }

    /// Fetch, merge, write.
    ///
    /// The three steps are separate statements, so a concurrent update or
    /// delete of the same id can interleave (lost update, update after
    /// delete). Use [`update_product_atomic`](Self::update_product_atomic)
    /// when that matters. A row deleted between the fetch and the write
    /// yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidInput` for a whitespace-only name or a
    /// negative price, and `CatalogError::BackendUnavailable` if either the
    /// fetch or the write fails.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn update_product(
        &self,
        id: i32,
        patch: ProductPatch,
    ) -> Result<Option<Product>, CatalogError> {
        validate_patch(&patch)?;
        let Some(existing) = self.store.fetch_by_id(id)? else {
            log::debug!("product {id} not found for update");
            return Ok(None);
        };
        let merged = patch.merge_into(&existing);
        Ok(self.store.update(&merged)?)
    }

    /// Same merge rules as [`update_product`](Self::update_product), applied
    /// by the backend in one statement.
    ///
    /// # Errors
    ///
    /// Same as [`update_product`](Self::update_product).
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn update_product_atomic(
        &self,
        id: i32,
        patch: ProductPatch,
    ) -> Result<Option<Product>, CatalogError> {
        validate_patch(&patch)?;
        Ok(self.store.merge_update(id, &patch)?)
    }

    /// `Ok(true)` iff a row was removed. Repeating the call yields `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::BackendUnavailable` if the delete fails.
    #[cfg_attr(feature = "tracing", instrument(skip(self)))]
    pub fn delete_product(&self, id: i32) -> Result<bool, CatalogError> {
        let removed = self.store.delete_by_id(id)?;
        Ok(removed > 0)
    }
}

fn validate_new_product(candidate: &NewProduct) -> Result<(), CatalogError> {
    if candidate.name.trim().is_empty() {
        return Err(CatalogError::InvalidInput("name must not be empty".to_string()));
    }
    validate_price(candidate.price)
}

// An empty patch name means "keep"; anything else must have visible characters.
fn validate_patch(patch: &ProductPatch) -> Result<(), CatalogError> {
    if let Some(name) = patch.name.as_deref() {
        if !name.is_empty() && name.trim().is_empty() {
            return Err(CatalogError::InvalidInput("name must not be blank".to_string()));
        }
    }
    match patch.price {
        Some(price) => validate_price(price),
        None => Ok(()),
    }
}

fn validate_price(price: Decimal) -> Result<(), CatalogError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(CatalogError::InvalidInput(format!(
            "price must not be negative, got {price}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::{MemoryProductStore, StoreOperation};

    fn service() -> CatalogService<MemoryProductStore> {
        CatalogService::new(MemoryProductStore::new())
    }

    fn price(units: i64, scale: u32) -> Decimal {
        Decimal::new(units, scale)
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let svc = service();
        let created = svc
            .create_product(NewProduct::new("Gadget", price(2500, 2)))
            .unwrap();
        let fetched = svc.get_product(created.id).unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[test]
    fn test_get_unknown_id_is_none_not_error() {
        let svc = service();
        assert!(matches!(svc.get_product(42), Ok(None)));
    }

    #[test]
    fn test_delete_twice() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Bolt", price(5, 1))).unwrap();
        assert!(svc.delete_product(created.id).unwrap());
        assert!(!svc.delete_product(created.id).unwrap());
    }

    #[test]
    fn test_update_with_empty_patch_is_noop() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Nut", price(120, 2))).unwrap();
        let patch = ProductPatch::new(Some(String::new()), Some(Decimal::ZERO));
        let updated = svc.update_product(created.id, patch).unwrap();
        assert_eq!(updated, Some(created.clone()));
        assert_eq!(svc.get_product(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_update_name_only_preserves_price() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Nut", price(120, 2))).unwrap();
        let patch = ProductPatch::new(Some("X".to_string()), Some(Decimal::ZERO));
        let updated = svc.update_product(created.id, patch).unwrap().unwrap();
        assert_eq!(updated.name, "X");
        assert_eq!(updated.price, price(120, 2));
        assert_eq!(updated.id, created.id);
    }

    #[test]
    fn test_update_unknown_id_is_none() {
        let svc = service();
        let patch = ProductPatch::new(Some("X".to_string()), None);
        assert!(matches!(svc.update_product(9, patch.clone()), Ok(None)));
        assert!(matches!(svc.update_product_atomic(9, patch), Ok(None)));
    }

    #[test]
    fn test_list_empty_table() {
        let svc = service();
        let products = svc.list_products().unwrap();
        assert!(products.is_empty());
    }

    #[test]
    fn test_widget_scenario() {
        let svc = service();

        let created = svc
            .create_product(NewProduct::new("Widget", price(999, 2)))
            .unwrap();
        assert_eq!(created.id, 1);

        let fetched = svc.get_product(1).unwrap().unwrap();
        assert_eq!(
            fetched,
            Product { id: 1, name: "Widget".to_string(), price: price(999, 2) }
        );

        let updated = svc
            .update_product(1, ProductPatch::new(Some(String::new()), Some(price(1250, 2))))
            .unwrap()
            .unwrap();
        assert_eq!(
            updated,
            Product { id: 1, name: "Widget".to_string(), price: price(1250, 2) }
        );

        assert!(svc.delete_product(1).unwrap());
        assert!(svc.get_product(1).unwrap().is_none());
    }

    #[test]
    fn test_atomic_update_applies_same_merge_rules() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();

        let untouched = svc
            .update_product_atomic(
                created.id,
                ProductPatch::new(Some(String::new()), Some(Decimal::ZERO)),
            )
            .unwrap();
        assert_eq!(untouched, Some(created.clone()));

        let renamed = svc
            .update_product_atomic(
                created.id,
                ProductPatch::new(Some("Sprocket".to_string()), None),
            )
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Sprocket");
        assert_eq!(renamed.price, price(999, 2));
    }

    #[test]
    fn test_create_rejects_invalid_candidates() {
        let svc = service();
        let err = svc.create_product(NewProduct::new("   ", price(1, 0))).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));

        let err = svc.create_product(NewProduct::new("Widget", price(-1, 0))).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));

        assert!(svc.store().is_empty());
    }

    #[test]
    fn test_create_accepts_zero_price() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Freebie", Decimal::ZERO)).unwrap();
        assert_eq!(created.price, Decimal::ZERO);
    }

    #[test]
    fn test_update_rejects_negative_price() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();
        let err = svc
            .update_product(created.id, ProductPatch::new(None, Some(price(-5, 0))))
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
        assert_eq!(svc.get_product(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_backend_failures_propagate_unchanged() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();
        svc.store().set_available(false);

        let is_unavailable = |err: CatalogError| {
            matches!(err, CatalogError::BackendUnavailable(StoreError::Unavailable(_)))
        };
        assert!(is_unavailable(svc.list_products().unwrap_err()));
        assert!(is_unavailable(svc.get_product(created.id).unwrap_err()));
        assert!(is_unavailable(svc.delete_product(created.id).unwrap_err()));
        assert!(is_unavailable(
            svc.create_product(NewProduct::new("Other", price(1, 0))).unwrap_err()
        ));
        assert!(is_unavailable(
            svc.update_product(created.id, ProductPatch::new(Some("X".to_string()), None))
                .unwrap_err()
        ));
    }

    #[test]
    fn test_update_rejects_whitespace_only_name() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();
        let blank = ProductPatch::new(Some("   ".to_string()), None);

        let err = svc.update_product(created.id, blank.clone()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));
        let err = svc.update_product_atomic(created.id, blank).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput(_)));

        assert_eq!(svc.get_product(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_update_write_failure_after_successful_fetch() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();
        svc.store().fail_on(StoreOperation::Update);

        let err = svc
            .update_product(created.id, ProductPatch::new(Some("X".to_string()), None))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::BackendUnavailable(StoreError::Unavailable(_))
        ));
        assert_eq!(svc.get_product(created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_update_fetch_failure_skips_write() {
        let svc = service();
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();
        svc.store().fail_on(StoreOperation::FetchById);

        let err = svc
            .update_product(created.id, ProductPatch::new(Some("X".to_string()), None))
            .unwrap_err();
        assert!(matches!(err, CatalogError::BackendUnavailable(_)));

        svc.store().recover(StoreOperation::FetchById);
        assert_eq!(svc.get_product(created.id).unwrap(), Some(created));
    }

    /// Deletes the row right after handing it out, like a concurrent `DELETE`
    /// landing between the fetch and the write of `update_product`.
    struct DeletedAfterFetch(MemoryProductStore);

    impl ProductStore for DeletedAfterFetch {
        fn list_all(&self) -> Result<Vec<Product>, StoreError> {
            self.0.list_all()
        }

        fn insert(&self, name: &str, price: Decimal) -> Result<i32, StoreError> {
            self.0.insert(name, price)
        }

        fn fetch_by_id(&self, id: i32) -> Result<Option<Product>, StoreError> {
            let row = self.0.fetch_by_id(id)?;
            self.0.delete_by_id(id)?;
            Ok(row)
        }

        fn update(&self, product: &Product) -> Result<Option<Product>, StoreError> {
            self.0.update(product)
        }

        fn delete_by_id(&self, id: i32) -> Result<u64, StoreError> {
            self.0.delete_by_id(id)
        }

        fn merge_update(
            &self,
            id: i32,
            patch: &ProductPatch,
        ) -> Result<Option<Product>, StoreError> {
            self.0.merge_update(id, patch)
        }
    }

    #[test]
    fn test_update_after_concurrent_delete_is_none() {
        let svc = CatalogService::new(DeletedAfterFetch(MemoryProductStore::new()));
        let created = svc.create_product(NewProduct::new("Widget", price(999, 2))).unwrap();

        let outcome = svc
            .update_product(created.id, ProductPatch::new(Some("X".to_string()), None))
            .unwrap();
        assert_eq!(outcome, None);
        assert!(svc.store().0.is_empty());
    }

    #[test]
    fn test_clones_share_the_store() {
        let svc = service();
        let other = svc.clone();
        let created = svc.create_product(NewProduct::new("Shared", price(1, 0))).unwrap();
        assert_eq!(other.get_product(created.id).unwrap(), Some(created));
    }
}
