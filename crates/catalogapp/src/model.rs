//! # Domain Model
//!
//! [`Category`] and [`Product`] as the rest of the crate sees them, with
//! attribute maps already decoded. The persisted shape (attribute maps as JSON
//! text) lives in [`crate::store::rows`].
//!
//! ## Identity
//!
//! Ids are assigned by the store when a staged insert is committed. Until then
//! an entity carries id `0` (see [`Category::is_transient`]). Callers never
//! choose ids for new rows.
//!
//! ## Relationship
//!
//! Every product references exactly one category through `category_id`. The
//! category does not own its products; the "products of a category" view is
//! a scoped query on the product repository, and referential integrity is
//! enforced when a unit of work commits.
//!
//! ## Field Rules
//!
//! | Field | Rule |
//! |-------|------|
//! | `name` | required, at most 100 characters |
//! | `description` | optional, at most 500 characters |
//! | `price` | zero or positive |
//!
//! [`Category::validate`] and [`Product::validate`] collect every violated rule
//! instead of stopping at the first one.

use crate::attributes::AttributeMap;
use crate::error::{CatalogError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub additional_fields: AttributeMap,
}

impl Category {
    pub fn new(name: impl Into<String>, additional_fields: AttributeMap) -> Self {
        Self {
            id: 0,
            name: name.into(),
            additional_fields,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.id == 0
    }

    /// Keys in `fields` that this category's vocabulary does not define.
    pub fn unknown_keys(&self, fields: &AttributeMap) -> Vec<String> {
        fields.keys_missing_from(&self.additional_fields)
    }

    pub fn validate(&self) -> Result<()> {
        let mut reasons = Vec::new();
        check_name(&self.name, &mut reasons);
        into_result(reasons)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default)]
    pub additional_fields: AttributeMap,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, category_id: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            price,
            category_id,
            additional_fields: AttributeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fields(mut self, fields: AttributeMap) -> Self {
        self.additional_fields = fields;
        self
    }

    pub fn is_transient(&self) -> bool {
        self.id == 0
    }

    pub fn validate(&self) -> Result<()> {
        let mut reasons = Vec::new();
        check_name(&self.name, &mut reasons);
        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_CHARS {
                reasons.push(format!(
                    "Description cannot be longer than {} characters",
                    DESCRIPTION_MAX_CHARS
                ));
            }
        }
        if self.price < Decimal::ZERO {
            reasons.push("Price must be a positive number".to_string());
        }
        into_result(reasons)
    }
}

fn check_name(name: &str, reasons: &mut Vec<String>) {
    if name.trim().is_empty() {
        reasons.push("Name is required".to_string());
    } else if name.chars().count() > NAME_MAX_CHARS {
        reasons.push(format!(
            "Name cannot be longer than {} characters",
            NAME_MAX_CHARS
        ));
    }
}

fn into_result(reasons: Vec<String>) -> Result<()> {
    if reasons.is_empty() {
        Ok(())
    } else {
        Err(CatalogError::Validation(reasons))
    }
}
