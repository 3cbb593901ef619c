//! Persisted row shapes.
//!
//! Rows are what a backend actually stores. They differ from the domain model
//! in one way: attribute maps are kept as JSON text in a single column, and
//! are only decoded when a row is read back into a [`Category`] or
//! [`Product`].

use crate::attributes::AttributeMap;
use crate::error::{CatalogError, Entity, Result};
use crate::model::{Category, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub additional_fields: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default)]
    pub additional_fields: String,
}

impl CategoryRow {
    pub fn encode(id: i64, category: &Category) -> Result<Self> {
        Ok(Self {
            id,
            name: category.name.clone(),
            additional_fields: category.additional_fields.to_column()?,
        })
    }

    pub fn decode(&self) -> Result<Category> {
        Ok(Category {
            id: self.id,
            name: self.name.clone(),
            additional_fields: AttributeMap::from_column(&self.additional_fields)?,
        })
    }
}

impl ProductRow {
    pub fn encode(id: i64, product: &Product) -> Result<Self> {
        Ok(Self {
            id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            category_id: product.category_id,
            additional_fields: product.additional_fields.to_column()?,
        })
    }

    pub fn decode(&self) -> Result<Product> {
        Ok(Product {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            category_id: self.category_id,
            additional_fields: AttributeMap::from_column(&self.additional_fields)?,
        })
    }
}

/// Both tables plus their id sequences.
///
/// Tables are keyed by id in a `BTreeMap`, so scans return rows in id order and
/// repeated reads of the same snapshot return the same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub categories: BTreeMap<i64, CategoryRow>,
    #[serde(default)]
    pub products: BTreeMap<i64, ProductRow>,
    #[serde(default)]
    pub category_seq: i64,
    #[serde(default)]
    pub product_seq: i64,
}

fn advance(current: i64, entity: Entity) -> Result<i64> {
    current
        .checked_add(1)
        .ok_or_else(|| CatalogError::Store(format!("{} id sequence is exhausted", entity)))
}

impl Tables {
    /// Advance the category sequence. Ids are never reused, even after deletes,
    /// and never collide with rows written by hand.
    pub fn next_category_id(&mut self) -> Result<i64> {
        let max = self.categories.keys().next_back().copied().unwrap_or(0);
        self.category_seq = advance(self.category_seq.max(max), Entity::Category)?;
        Ok(self.category_seq)
    }

    pub fn next_product_id(&mut self) -> Result<i64> {
        let max = self.products.keys().next_back().copied().unwrap_or(0);
        self.product_seq = advance(self.product_seq.max(max), Entity::Product)?;
        Ok(self.product_seq)
    }

    pub fn products_in(&self, category_id: i64) -> impl Iterator<Item = &ProductRow> {
        self.products
            .values()
            .filter(move |row| row.category_id == category_id)
    }
}
