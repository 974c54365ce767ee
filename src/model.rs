//! Product domain types
//!
//! `Product` is the only entity. `NewProduct` is the create candidate (no id yet)
//! and `ProductPatch` carries the sparse fields of an update request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted product row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i32,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// Candidate for a new product; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }

    /// Attach the backend-assigned id.
    pub fn with_id(self, id: i32) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
        }
    }
}

/// Fields of an update request. Missing fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
}

impl ProductPatch {
    pub fn new(name: Option<String>, price: Option<Decimal>) -> Self {
        Self { name, price }
    }

    /// Name that would overwrite the stored one: present and non-empty.
    pub fn effective_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Price that would overwrite the stored one: present and non-zero.
    ///
    /// Zero counts as "unspecified", so a patch cannot set a price to zero.
    pub fn effective_price(&self) -> Option<Decimal> {
        self.price.filter(|price| !price.is_zero())
    }

    /// True when applying the patch cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.effective_name().is_none() && self.effective_price().is_none()
    }

    /// Merge-on-update: returns a copy of `existing` with the effective fields
    /// replaced. The id is never touched.
    pub fn merge_into(&self, existing: &Product) -> Product {
        let mut merged = existing.clone();
        if let Some(name) = self.effective_name() {
            merged.name = name.to_string();
        }
        if let Some(price) = self.effective_price() {
            merged.price = price;
        }
        merged
    }
}
