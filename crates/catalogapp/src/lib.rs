//! # Catalogapp
//!
//! A small catalog of categories and products whose interesting part is the
//! **attribute filter**: both entities carry a schema-less map of extra
//! attributes, and products can be queried by any combination of them, with
//! the parent category's attributes acting as a fallback.
//!
//! ## Layering
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  API Facade (api.rs)                                         │
//! │  - One session per call, caller-supplied cancellation        │
//! │  - Dispatches to services                                    │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Services (services/*)                                       │
//! │  - DTO validation, vocabulary checks, entity <-> DTO mapping │
//! │  - Converts infrastructure failures at the boundary          │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Store (store/*)                                             │
//! │  - Repositories + unit of work over a Session                │
//! │  - StorageBackend: memory or a JSON document on disk         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this crate writes to stdout or knows about HTTP. The `catalog`
//! crate owns transport, process setup and log output.
//!
//! ## Quick Tour
//!
//! ```
//! use catalogapp::api::CatalogApi;
//! use catalogapp::attributes::AttributeMap;
//! use catalogapp::dto::{CategoryPostDto, ProductPostDto};
//! use catalogapp::store::mem_backend::MemBackend;
//! use rust_decimal::Decimal;
//! use tokio_util::sync::CancellationToken;
//!
//! let api = CatalogApi::new(MemBackend::new());
//! let cancel = CancellationToken::new();
//!
//! let phones = api
//!     .create_category(
//!         CategoryPostDto {
//!             name: "Phones".into(),
//!             additional_fields: Some([("color", "black")].into_iter().collect()),
//!         },
//!         &cancel,
//!     )
//!     .unwrap();
//!
//! api.create_product(
//!     ProductPostDto {
//!         name: "X".into(),
//!         description: None,
//!         price: Decimal::new(999, 2),
//!         category_id: phones.id,
//!         additional_fields: None,
//!     },
//!     &cancel,
//! )
//! .unwrap();
//!
//! let filter: AttributeMap = [("color", "black")].into_iter().collect();
//! let found = api.products_by_filter(phones.id, filter, &cancel).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

pub mod api;
pub mod attributes;
pub mod config;
pub mod dto;
pub mod error;
pub mod model;
pub mod services;
pub mod store;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
