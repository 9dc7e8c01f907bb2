//! Record types: the stored [`Product`], the creation payload
//! [`ProductInput`], and the partial-update payload [`ProductPatch`].

use serde::{Deserialize, Serialize};

/// A persisted product record. `id` is assigned by the store and never
/// changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Store-assigned identifier; always equal to the record's key. A stored
    /// record without one takes its key on load.
    #[serde(default)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price.
    pub price: f64,
    /// Units in stock.
    pub quantity: i64,
}

impl Product {
    /// Build a record from a creation payload, field by field.
    pub fn from_input(id: impl Into<String>, input: ProductInput) -> Self {
        Self {
            id: id.into(),
            name: input.name,
            description: input.description,
            price: input.price,
            quantity: input.quantity,
        }
    }
}

/// A product without an identifier, used to create records.
///
/// Deserializing ignores unknown fields, so an `id` sent by a client is
/// dropped here rather than trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price.
    pub price: f64,
    /// Units in stock.
    pub quantity: i64,
}

/// Partial update. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPatch {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// New quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl ProductPatch {
    /// Patch that only sets the price.
    pub fn price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Self::default()
        }
    }

    /// Patch that only sets the quantity.
    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    /// Shallow-merge this patch over `product`. The record's `id` is never
    /// touched.
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(quantity) = self.quantity {
            product.quantity = quantity;
        }
    }
}

impl From<ProductInput> for ProductPatch {
    fn from(input: ProductInput) -> Self {
        Self {
            name: Some(input.name),
            description: Some(input.description),
            price: Some(input.price),
            quantity: Some(input.quantity),
        }
    }
}
