use super::backend::StorageBackend;
use super::rows::{CategoryRow, ProductRow, Tables};
use super::{CategoryRepository, CommitReport, Pending, ProductRepository, UnitOfWork};
use crate::attributes::{AttrFilter, AttributeMap};
use crate::error::{CatalogError, Entity, Result};
use crate::model::{Category, Product};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Change {
    AddCategory(Category),
    UpdateCategory(Category),
    DeleteCategory(i64),
    AddProduct(Product),
    UpdateProduct(Product),
    DeleteProduct(i64),
}

/// The per-request persistence context.
///
/// A session borrows the backend for the duration of one logical request and
/// implements both repositories plus the unit of work over it. Staged changes
/// live only in the session; dropping it without committing discards them.
pub struct Session<'a, B: StorageBackend> {
    backend: &'a B,
    cancel: CancellationToken,
    staged: Vec<Change>,
    pending_inserts: usize,
}

impl<'a, B: StorageBackend> Session<'a, B> {
    pub fn begin(backend: &'a B, cancel: CancellationToken) -> Self {
        Self {
            backend,
            cancel,
            staged: Vec::new(),
            pending_inserts: 0,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(CatalogError::Cancelled);
        }
        Ok(())
    }

    fn stage_insert(&mut self, change: Change) -> Pending {
        let pending = Pending::new(self.pending_inserts);
        self.pending_inserts += 1;
        self.staged.push(change);
        pending
    }

    fn category_row(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.backend.read(|tables| tables.categories.get(&id).cloned())
    }

    fn decode_products(&self, rows: Vec<ProductRow>) -> Result<Vec<Product>> {
        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            self.ensure_live()?;
            products.push(row.decode()?);
        }
        Ok(products)
    }
}

impl<B: StorageBackend> CategoryRepository for Session<'_, B> {
    fn get_category(&self, id: i64) -> Result<Category> {
        self.ensure_live()?;
        self.category_row(id)?
            .ok_or(CatalogError::not_found(Entity::Category, id))?
            .decode()
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        self.ensure_live()?;
        let rows: Vec<CategoryRow> = self
            .backend
            .read(|tables| tables.categories.values().cloned().collect())?;

        let mut categories = Vec::with_capacity(rows.len());
        for row in rows {
            self.ensure_live()?;
            categories.push(row.decode()?);
        }
        Ok(categories)
    }

    fn add_category(&mut self, category: Category) -> Result<Pending> {
        self.ensure_live()?;
        Ok(self.stage_insert(Change::AddCategory(category)))
    }

    fn update_category(&mut self, category: Category) -> Result<()> {
        self.ensure_live()?;
        if self.category_row(category.id)?.is_none() {
            return Err(CatalogError::not_found(Entity::Category, category.id));
        }
        self.staged.push(Change::UpdateCategory(category));
        Ok(())
    }

    fn delete_category(&mut self, id: i64) -> Result<()> {
        self.ensure_live()?;
        if self.category_row(id)?.is_none() {
            return Err(CatalogError::not_found(Entity::Category, id));
        }
        self.staged.push(Change::DeleteCategory(id));
        Ok(())
    }
}

impl<B: StorageBackend> ProductRepository for Session<'_, B> {
    fn get_product(&self, id: i64) -> Result<Product> {
        self.ensure_live()?;
        self.backend
            .read(|tables| tables.products.get(&id).cloned())?
            .ok_or(CatalogError::not_found(Entity::Product, id))?
            .decode()
    }

    fn list_products(&self, category_id: Option<i64>) -> Result<Vec<Product>> {
        self.ensure_live()?;
        let rows: Vec<ProductRow> = self.backend.read(|tables| match category_id {
            Some(category_id) => tables.products_in(category_id).cloned().collect(),
            None => tables.products.values().cloned().collect(),
        })?;
        self.decode_products(rows)
    }

    fn filter_products(&self, category_id: i64, filter: &AttrFilter) -> Result<Vec<Product>> {
        self.ensure_live()?;

        // Narrow to one category first; every candidate shares its vocabulary.
        let (category, rows) = self.backend.read(|tables| {
            (
                tables.categories.get(&category_id).cloned(),
                tables.products_in(category_id).cloned().collect::<Vec<_>>(),
            )
        })?;

        let category_fields = match category {
            Some(row) => row.decode()?.additional_fields,
            None => AttributeMap::new(),
        };

        let candidates = self.decode_products(rows)?;
        if filter.is_empty() {
            return Ok(candidates);
        }

        let mut matched = Vec::new();
        for product in candidates {
            self.ensure_live()?;
            if filter.matches(&product.additional_fields, &category_fields) {
                for (key, value) in filter.pairs().iter() {
                    let source = AttrFilter::match_source(
                        key,
                        value,
                        &product.additional_fields,
                        &category_fields,
                    );
                    trace!(product_id = product.id, key = %key, ?source, "filter pair matched");
                }
                matched.push(product);
            }
        }

        debug!(
            category_id,
            pairs = filter.pairs().len(),
            matched = matched.len(),
            "filtered products"
        );
        Ok(matched)
    }

    fn add_product(&mut self, product: Product) -> Result<Pending> {
        self.ensure_live()?;
        Ok(self.stage_insert(Change::AddProduct(product)))
    }

    fn update_product(&mut self, product: Product) -> Result<()> {
        self.ensure_live()?;
        let exists = self
            .backend
            .read(|tables| tables.products.contains_key(&product.id))?;
        if !exists {
            return Err(CatalogError::not_found(Entity::Product, product.id));
        }
        self.staged.push(Change::UpdateProduct(product));
        Ok(())
    }

    fn delete_product(&mut self, id: i64) -> Result<()> {
        self.ensure_live()?;
        let exists = self
            .backend
            .read(|tables| tables.products.contains_key(&id))?;
        if !exists {
            return Err(CatalogError::not_found(Entity::Product, id));
        }
        self.staged.push(Change::DeleteProduct(id));
        Ok(())
    }
}

impl<B: StorageBackend> UnitOfWork for Session<'_, B> {
    fn commit(&mut self) -> Result<CommitReport> {
        self.ensure_live()?;

        let staged = std::mem::take(&mut self.staged);
        self.pending_inserts = 0;
        if staged.is_empty() {
            return Ok(CommitReport::default());
        }

        let cancel = self.cancel.clone();
        let report = self.backend.transact(|tables| {
            let mut report = CommitReport::default();
            for change in &staged {
                apply(tables, change, &mut report)?;
            }
            check_integrity(tables, &staged, &report)?;

            // Last point at which the whole transaction can still be abandoned.
            if cancel.is_cancelled() {
                return Err(CatalogError::Cancelled);
            }
            Ok(report)
        })?;

        debug!(
            affected_rows = report.affected_rows,
            inserted = report.inserted_ids.len(),
            "unit of work committed"
        );
        Ok(report)
    }

    fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

fn apply(tables: &mut Tables, change: &Change, report: &mut CommitReport) -> Result<()> {
    match change {
        Change::AddCategory(category) => {
            let id = tables.next_category_id()?;
            tables
                .categories
                .insert(id, CategoryRow::encode(id, category)?);
            report.inserted_ids.push(id);
        }
        Change::UpdateCategory(category) => {
            if !tables.categories.contains_key(&category.id) {
                return Err(vanished(Entity::Category, category.id));
            }
            tables
                .categories
                .insert(category.id, CategoryRow::encode(category.id, category)?);
        }
        Change::DeleteCategory(id) => {
            if tables.categories.remove(id).is_none() {
                return Err(vanished(Entity::Category, *id));
            }
        }
        Change::AddProduct(product) => {
            let id = tables.next_product_id()?;
            tables.products.insert(id, ProductRow::encode(id, product)?);
            report.inserted_ids.push(id);
        }
        Change::UpdateProduct(product) => {
            if !tables.products.contains_key(&product.id) {
                return Err(vanished(Entity::Product, product.id));
            }
            tables
                .products
                .insert(product.id, ProductRow::encode(product.id, product)?);
        }
        Change::DeleteProduct(id) => {
            if tables.products.remove(id).is_none() {
                return Err(vanished(Entity::Product, *id));
            }
        }
    }
    report.affected_rows += 1;
    Ok(())
}

fn vanished(entity: Entity, id: i64) -> CatalogError {
    CatalogError::Store(format!(
        "{} {} was removed before the change could be committed",
        entity, id
    ))
}

/// Referential checks over the post-commit state.
fn check_integrity(tables: &Tables, staged: &[Change], report: &CommitReport) -> Result<()> {
    let mut inserted = report.inserted_ids.iter();
    for change in staged {
        let (product_id, category_id) = match change {
            Change::AddCategory(_) => {
                inserted.next();
                continue;
            }
            Change::AddProduct(product) => match inserted.next() {
                Some(id) => (*id, product.category_id),
                None => continue,
            },
            Change::UpdateProduct(product) => (product.id, product.category_id),
            Change::DeleteCategory(id) => {
                let owned = tables.products_in(*id).count();
                if owned > 0 {
                    return Err(CatalogError::Store(format!(
                        "Category {} still has {} product(s)",
                        id, owned
                    )));
                }
                continue;
            }
            Change::UpdateCategory(_) | Change::DeleteProduct(_) => continue,
        };

        // A later change in the same unit may have removed the product again.
        if !tables.products.contains_key(&product_id) {
            continue;
        }
        if !tables.categories.contains_key(&category_id) {
            return Err(CatalogError::Store(format!(
                "Product {} references missing category {}",
                product_id, category_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemBackend;
    use crate::store::memory::fixtures::CatalogFixture;
    use rust_decimal::Decimal;

    fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
        pairs.iter().copied().collect()
    }

    fn session(backend: &MemBackend) -> Session<'_, MemBackend> {
        Session::begin(backend, CancellationToken::new())
    }

    // --- Reads ---

    #[test]
    fn get_missing_rows_is_not_found() {
        let backend = MemBackend::new();
        let s = session(&backend);
        assert!(matches!(
            s.get_category(1),
            Err(CatalogError::NotFound {
                entity: Entity::Category,
                id: 1
            })
        ));
        assert!(matches!(
            s.get_product(1),
            Err(CatalogError::NotFound {
                entity: Entity::Product,
                id: 1
            })
        ));
    }

    #[test]
    fn list_products_scopes_to_category() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_category("Laptops", &[])
            .with_product(0, "P1", &[])
            .with_product(1, "L1", &[])
            .with_product(0, "P2", &[]);
        let s = session(&fx.backend);

        let phones = s.list_products(Some(fx.categories[0])).unwrap();
        let names: Vec<_> = phones.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["P1", "P2"]);

        assert_eq!(s.list_products(None).unwrap().len(), 3);
        assert!(s.list_products(Some(999)).unwrap().is_empty());
    }

    #[test]
    fn reads_are_deterministic_within_a_snapshot() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_product(0, "B", &[])
            .with_product(0, "A", &[])
            .with_product(0, "C", &[]);
        let s = session(&fx.backend);

        let first = s.list_products(Some(fx.categories[0])).unwrap();
        let second = s.list_products(Some(fx.categories[0])).unwrap();
        assert_eq!(first, second);
    }

    // --- Filtering ---

    #[test]
    fn empty_filter_returns_whole_category() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "black")])
            .with_product(0, "P1", &[("color", "red")])
            .with_product(0, "P2", &[]);
        let s = session(&fx.backend);

        let found = s
            .filter_products(fx.categories[0], &AttrFilter::default())
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn filter_uses_product_then_category() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "black")])
            .with_product(0, "Own black", &[("color", "black")])
            .with_product(0, "Inherits black", &[]);
        let s = session(&fx.backend);

        let filter: AttrFilter = [("color", "black")].into_iter().collect();
        let found = s.filter_products(fx.categories[0], &filter).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn filter_excludes_when_key_missing_everywhere() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "")])
            .with_product(0, "P1", &[("color", "red")]);
        let s = session(&fx.backend);

        let filter: AttrFilter = [("ram", "8GB")].into_iter().collect();
        assert!(s
            .filter_products(fx.categories[0], &filter)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filter_never_crosses_categories() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_category("Laptops", &[])
            .with_product(0, "Phone", &[("color", "black")])
            .with_product(1, "Laptop", &[("color", "black")]);
        let s = session(&fx.backend);

        let filter: AttrFilter = [("color", "black")].into_iter().collect();
        let found = s.filter_products(fx.categories[1], &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Laptop");
    }

    #[test]
    fn filter_requires_every_pair() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "black"), ("ram", "")])
            .with_product(0, "8GB", &[("ram", "8GB")])
            .with_product(0, "4GB", &[("ram", "4GB")]);
        let s = session(&fx.backend);

        let filter: AttrFilter = [("color", "black"), ("ram", "8GB")].into_iter().collect();
        let found = s.filter_products(fx.categories[0], &filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "8GB");
    }

    // --- Staging & commit ---

    #[test]
    fn staged_insert_is_invisible_until_commit() {
        let backend = MemBackend::new();
        let mut s = session(&backend);

        let pending = s
            .add_category(Category::new("Phones", AttributeMap::new()))
            .unwrap();
        assert!(s.list_categories().unwrap().is_empty());
        assert_eq!(s.staged_len(), 1);
        assert_eq!(backend.commit_count(), 0);

        let report = s.commit().unwrap();
        assert_eq!(report.affected_rows, 1);
        let id = report.id_of(pending).unwrap();
        assert_eq!(s.get_category(id).unwrap().name, "Phones");
        assert_eq!(s.staged_len(), 0);
    }

    #[test]
    fn commit_assigns_ids_in_staging_order() {
        let backend = MemBackend::new();
        let mut s = session(&backend);
        let a = s
            .add_category(Category::new("A", AttributeMap::new()))
            .unwrap();
        let b = s
            .add_category(Category::new("B", AttributeMap::new()))
            .unwrap();

        let report = s.commit().unwrap();
        assert_eq!(report.id_of(a), Some(1));
        assert_eq!(report.id_of(b), Some(2));
    }

    #[test]
    fn empty_commit_touches_nothing() {
        let backend = MemBackend::new();
        let mut s = session(&backend);
        assert_eq!(s.commit().unwrap(), CommitReport::default());
        assert_eq!(backend.commit_count(), 0);
    }

    #[test]
    fn update_replaces_the_whole_row() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "")])
            .with_product(0, "P1", &[("color", "red")]);
        let mut s = session(&fx.backend);

        let mut product = s.get_product(fx.products[0]).unwrap();
        product.additional_fields = AttributeMap::new();
        product.description = Some("plain".into());
        s.update_product(product).unwrap();
        s.commit().unwrap();

        let stored = s.get_product(fx.products[0]).unwrap();
        assert!(stored.additional_fields.is_empty());
        assert_eq!(stored.description.as_deref(), Some("plain"));
    }

    #[test]
    fn update_and_delete_of_missing_rows_fail_at_staging() {
        let backend = MemBackend::new();
        let mut s = session(&backend);

        let mut ghost = Product::new("Ghost", Decimal::ONE, 1);
        ghost.id = 5;
        assert!(matches!(
            s.update_product(ghost),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            s.delete_product(5),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            s.delete_category(5),
            Err(CatalogError::NotFound { .. })
        ));
        assert_eq!(s.staged_len(), 0);
    }

    #[test]
    fn product_must_reference_existing_category() {
        let backend = MemBackend::new();
        let mut s = session(&backend);
        s.add_product(Product::new("Orphan", Decimal::ONE, 42))
            .unwrap();

        let err = s.commit().unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));
        assert!(backend.snapshot().products.is_empty());
    }

    #[test]
    fn category_and_product_can_be_added_together() {
        let backend = MemBackend::new();
        let mut s = session(&backend);
        s.add_category(Category::new("Phones", AttributeMap::new()))
            .unwrap();
        // Category ids start at 1 on an empty store.
        s.add_product(Product::new("X", Decimal::ONE, 1)).unwrap();

        let report = s.commit().unwrap();
        assert_eq!(report.affected_rows, 2);
        assert_eq!(report.inserted_ids, vec![1, 1]);
    }

    #[test]
    fn deleting_category_with_products_is_rejected() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_product(0, "P1", &[]);
        let mut s = session(&fx.backend);

        s.delete_category(fx.categories[0]).unwrap();
        assert!(matches!(s.commit(), Err(CatalogError::Store(_))));
        assert!(s.get_category(fx.categories[0]).is_ok());
    }

    #[test]
    fn deleting_products_then_category_in_one_unit() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_product(0, "P1", &[]);
        let mut s = session(&fx.backend);

        s.delete_product(fx.products[0]).unwrap();
        s.delete_category(fx.categories[0]).unwrap();
        assert_eq!(s.commit().unwrap().affected_rows, 2);
        assert!(fx.backend.snapshot().categories.is_empty());
    }

    #[test]
    fn row_removed_between_staging_and_commit_fails_commit() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[])
            .with_product(0, "P1", &[]);

        let mut first = session(&fx.backend);
        let mut second = session(&fx.backend);
        first.delete_product(fx.products[0]).unwrap();
        second.delete_product(fx.products[0]).unwrap();

        first.commit().unwrap();
        assert!(matches!(second.commit(), Err(CatalogError::Store(_))));
    }

    #[test]
    fn write_failure_publishes_nothing() {
        let backend = MemBackend::new();
        let mut s = session(&backend);
        s.add_category(Category::new("Phones", AttributeMap::new()))
            .unwrap();
        backend.set_simulate_write_error(true);

        assert!(s.commit().is_err());
        backend.set_simulate_write_error(false);
        assert!(backend.snapshot().categories.is_empty());
    }

    #[test]
    fn corrupt_attribute_column_surfaces_as_serialization_error() {
        let mut tables = Tables::default();
        tables.categories.insert(
            1,
            CategoryRow {
                id: 1,
                name: "Broken".into(),
                additional_fields: "{oops".into(),
            },
        );
        let backend = MemBackend::with_tables(tables);
        let s = session(&backend);
        assert!(matches!(
            s.get_category(1),
            Err(CatalogError::Serialization(_))
        ));
    }

    // --- Cancellation ---

    #[test]
    fn cancelled_session_refuses_reads_and_writes() {
        let fx = CatalogFixture::new().with_category("Phones", &[]);
        let cancel = CancellationToken::new();
        let mut s = Session::begin(&fx.backend, cancel.clone());
        cancel.cancel();

        assert!(matches!(s.list_categories(), Err(CatalogError::Cancelled)));
        assert!(matches!(
            s.filter_products(fx.categories[0], &AttrFilter::default()),
            Err(CatalogError::Cancelled)
        ));
        assert!(matches!(
            s.add_category(Category::new("X", AttributeMap::new())),
            Err(CatalogError::Cancelled)
        ));
    }

    #[test]
    fn cancellation_before_commit_discards_staged_work() {
        let backend = MemBackend::new();
        let cancel = CancellationToken::new();
        let mut s = Session::begin(&backend, cancel.clone());
        s.add_category(Category::new("Phones", attrs(&[("color", "black")])))
            .unwrap();

        cancel.cancel();
        assert!(matches!(s.commit(), Err(CatalogError::Cancelled)));
        assert!(backend.snapshot().categories.is_empty());
        assert_eq!(backend.commit_count(), 0);
    }

    /// Cancels its token as soon as the store is touched, so the session only
    /// notices at a check after the entry check has already passed.
    struct CancelsMidCall<'a> {
        inner: &'a MemBackend,
        cancel: CancellationToken,
    }

    impl StorageBackend for CancelsMidCall<'_> {
        fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
            self.cancel.cancel();
            self.inner.read(f)
        }

        fn transact<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
            self.cancel.cancel();
            self.inner.transact(f)
        }
    }

    #[test]
    fn cancellation_during_scan_stops_at_next_row() {
        let fx = CatalogFixture::new()
            .with_category("Phones", &[("color", "black")])
            .with_product(0, "P1", &[])
            .with_product(0, "P2", &[]);
        let cancel = CancellationToken::new();
        let backend = CancelsMidCall {
            inner: &fx.backend,
            cancel: cancel.clone(),
        };
        let s = Session::begin(&backend, cancel);
        let filter: AttrFilter = [("color", "black")].into_iter().collect();

        assert!(matches!(
            s.filter_products(fx.categories[0], &filter),
            Err(CatalogError::Cancelled)
        ));
    }

    #[test]
    fn cancellation_inside_transaction_publishes_nothing() {
        let inner = MemBackend::new();
        let cancel = CancellationToken::new();
        let backend = CancelsMidCall {
            inner: &inner,
            cancel: cancel.clone(),
        };
        let mut s = Session::begin(&backend, cancel);
        s.add_category(Category::new("Phones", AttributeMap::new()))
            .unwrap();

        assert!(matches!(s.commit(), Err(CatalogError::Cancelled)));
        assert!(inner.snapshot().categories.is_empty());
        assert_eq!(inner.commit_count(), 0);
    }
}
