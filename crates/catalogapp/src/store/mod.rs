//! # Storage Layer
//!
//! This module defines the persistence contract the services program against:
//! two repositories and a unit of work.
//!
//! ## Staging and Commit
//!
//! Repository writes (`add_*`, `update_*`, `delete_*`) only **stage** a change.
//! Nothing is visible to any reader, including the session that staged it,
//! until [`UnitOfWork::commit`] runs. Commit applies every staged change in
//! order inside a single backend transaction:
//!
//! 1. **Inserts** take the next id from the table's sequence.
//! 2. **Updates** replace the whole row (last writer wins, no version check).
//! 3. **Deletes** remove the row.
//! 4. **Integrity**: every product written must reference an existing
//!    category, and a deleted category must not own products.
//!
//! If any step fails, nothing is published.
//!
//! ## Missing Rows
//!
//! `get_*`, `update_*` and `delete_*` fail with `NotFound` when the row does
//! not exist at the time of the call. A row that disappears between staging
//! and commit fails the commit.
//!
//! ## Cancellation
//!
//! A [`session::Session`] carries the caller's cancellation token. Every
//! repository call checks it on entry, scans check it per row, and commit
//! checks it before publishing. A cancelled call returns `Cancelled`, never a
//! partial result.
//!
//! ## Implementations
//!
//! - [`session::Session`]: repositories + unit of work over any backend.
//! - [`mem_backend::MemBackend`]: in memory, for tests and ephemeral servers.
//! - [`fs_backend::FsBackend`]: a single JSON document on disk.
//!
//! ## Storage Layout
//!
//! ```text
//! catalog.json
//! ├── categories   { id -> CategoryRow }   additional_fields as JSON text
//! ├── products     { id -> ProductRow }    additional_fields as JSON text
//! ├── category_seq
//! └── product_seq
//! ```

use crate::attributes::AttrFilter;
use crate::error::Result;
use crate::model::{Category, Product};

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod memory;
pub mod rows;
pub mod session;

/// Ticket for a staged insert. Resolve it against the [`CommitReport`] of the
/// commit that published it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending(usize);

impl Pending {
    pub(crate) fn new(slot: usize) -> Self {
        Self(slot)
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Rows inserted, replaced or removed.
    pub affected_rows: usize,
    /// Ids assigned to staged inserts, in staging order.
    pub inserted_ids: Vec<i64>,
}

impl CommitReport {
    pub fn id_of(&self, pending: Pending) -> Option<i64> {
        self.inserted_ids.get(pending.0).copied()
    }
}

pub trait CategoryRepository {
    /// Get a category by id
    fn get_category(&self, id: i64) -> Result<Category>;

    /// List every category
    fn list_categories(&self) -> Result<Vec<Category>>;

    /// Stage a new category; its id is assigned on commit
    fn add_category(&mut self, category: Category) -> Result<Pending>;

    /// Stage a full replace of an existing category
    fn update_category(&mut self, category: Category) -> Result<()>;

    /// Stage removal of an existing category
    fn delete_category(&mut self, id: i64) -> Result<()>;
}

pub trait ProductRepository {
    /// Get a product by id
    fn get_product(&self, id: i64) -> Result<Product>;

    /// List all products, or only those of one category
    fn list_products(&self, category_id: Option<i64>) -> Result<Vec<Product>>;

    /// Products of `category_id` passing `filter`, checking each pair against
    /// the product's attributes and then the category's
    fn filter_products(&self, category_id: i64, filter: &AttrFilter) -> Result<Vec<Product>>;

    /// Stage a new product; its id is assigned on commit
    fn add_product(&mut self, product: Product) -> Result<Pending>;

    /// Stage a full replace of an existing product
    fn update_product(&mut self, product: Product) -> Result<()>;

    /// Stage removal of an existing product
    fn delete_product(&mut self, id: i64) -> Result<()>;
}

pub trait UnitOfWork {
    /// Publish every staged change in one transaction
    fn commit(&mut self) -> Result<CommitReport>;

    /// Number of changes waiting for commit
    fn staged_len(&self) -> usize;
}
