//! # API Facade
//!
//! The API layer is a **thin facade** over the service layer. It is the single
//! entry point for catalog operations, whatever transport sits in front of it.
//!
//! ## Role and Responsibilities
//!
//! The facade:
//! - **Opens one session per call** with the caller's cancellation token, so
//!   every operation is its own unit of work
//! - **Dispatches** to the matching function in [`crate::services`]
//! - **Normalizes inputs** (raw filter maps become an [`AttrFilter`])
//!
//! It holds no business logic and does no I/O of its own.
//!
//! ## Generic Over StorageBackend
//!
//! `CatalogApi<B: StorageBackend>` is generic over the backend:
//! - Production: `CatalogApi<FsBackend>`
//! - Testing and `--in-memory`: `CatalogApi<MemBackend>`
//!
//! All methods take `&self`. Backends synchronize internally, so one facade can
//! be shared across threads behind an `Arc`.
//!
//! ## Cancellation
//!
//! Every method takes a [`CancellationToken`]. Cancelling it makes the
//! in-flight call return [`crate::error::CatalogError::Cancelled`] at its next
//! check, without publishing a partial commit.

use crate::attributes::{AttrFilter, AttributeMap};
use crate::config::AttributePolicy;
use crate::dto::{CategoryDto, CategoryPostDto, ProductDto, ProductPostDto};
use crate::error::Result;
use crate::services::{categories, products};
use crate::store::backend::StorageBackend;
use crate::store::session::Session;
use tokio_util::sync::CancellationToken;

pub struct CatalogApi<B: StorageBackend> {
    backend: B,
    policy: AttributePolicy,
}

impl<B: StorageBackend> CatalogApi<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, AttributePolicy::default())
    }

    pub fn with_policy(backend: B, policy: AttributePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> AttributePolicy {
        self.policy
    }

    fn session(&self, cancel: &CancellationToken) -> Session<'_, B> {
        Session::begin(&self.backend, cancel.clone())
    }

    // --- Categories ---

    pub fn create_category(
        &self,
        dto: CategoryPostDto,
        cancel: &CancellationToken,
    ) -> Result<CategoryDto> {
        categories::create(&mut self.session(cancel), dto)
    }

    pub fn category(&self, id: i64, cancel: &CancellationToken) -> Result<CategoryDto> {
        categories::get_by_id(&self.session(cancel), id)
    }

    pub fn categories(&self, cancel: &CancellationToken) -> Result<Vec<CategoryDto>> {
        categories::get_all(&self.session(cancel))
    }

    pub fn update_category(
        &self,
        id: i64,
        dto: CategoryPostDto,
        cancel: &CancellationToken,
    ) -> Result<CategoryDto> {
        categories::update(&mut self.session(cancel), id, dto)
    }

    pub fn delete_category(&self, id: i64, cancel: &CancellationToken) -> Result<()> {
        categories::delete(&mut self.session(cancel), id)
    }

    // --- Products ---

    pub fn create_product(
        &self,
        dto: ProductPostDto,
        cancel: &CancellationToken,
    ) -> Result<ProductDto> {
        products::create(&mut self.session(cancel), dto, self.policy)
    }

    pub fn product(&self, id: i64, cancel: &CancellationToken) -> Result<ProductDto> {
        products::get_by_id(&self.session(cancel), id)
    }

    pub fn products(
        &self,
        category_id: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductDto>> {
        products::get_all(&self.session(cancel), category_id)
    }

    pub fn products_by_category(
        &self,
        category_id: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductDto>> {
        products::get_by_category(&self.session(cancel), category_id)
    }

    pub fn products_by_filter(
        &self,
        category_id: i64,
        filter: AttributeMap,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProductDto>> {
        products::get_by_filter(
            &self.session(cancel),
            category_id,
            &AttrFilter::from(filter),
        )
    }

    pub fn update_product(
        &self,
        id: i64,
        dto: ProductPostDto,
        cancel: &CancellationToken,
    ) -> Result<ProductDto> {
        products::update(&mut self.session(cancel), id, dto, self.policy)
    }

    pub fn delete_product(&self, id: i64, cancel: &CancellationToken) -> Result<()> {
        products::delete(&mut self.session(cancel), id)
    }
}
