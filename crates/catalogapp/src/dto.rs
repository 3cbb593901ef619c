//! Transport shapes for categories and products.
//!
//! `*PostDto` types carry what a client may send when creating or replacing an
//! entity (no id). `CategoryDto` / `ProductDto` are what the catalog hands back.
//! Field names are camelCase on the wire.
//!
//! `additionalFields` is optional inbound and always present outbound: an
//! absent map becomes an empty one on the way in.

use crate::attributes::AttributeMap;
use crate::model::{Category, Product};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_fields: Option<AttributeMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPostDto {
    pub name: String,
    #[serde(default)]
    pub additional_fields: Option<AttributeMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_fields: Option<AttributeMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPostDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: i64,
    #[serde(default)]
    pub additional_fields: Option<AttributeMap>,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            additional_fields: Some(category.additional_fields),
        }
    }
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            additional_fields: Some(product.additional_fields),
        }
    }
}

impl CategoryPostDto {
    /// Build the entity this request describes, keeping `id` for replacements.
    pub fn into_category(self, id: i64) -> Category {
        Category {
            id,
            name: self.name,
            additional_fields: self.additional_fields.unwrap_or_default(),
        }
    }
}

impl ProductPostDto {
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            category_id: self.category_id,
            additional_fields: self.additional_fields.unwrap_or_default(),
        }
    }
}
