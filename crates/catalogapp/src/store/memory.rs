use super::mem_backend::MemBackend;
use super::session::Session;
use tokio_util::sync::CancellationToken;

/// A session over a private in-memory backend, for one-off use.
pub fn ephemeral_session(backend: &MemBackend) -> Session<'_, MemBackend> {
    Session::begin(backend, CancellationToken::new())
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::attributes::AttributeMap;
    use crate::model::{Category, Product};
    use crate::store::{CategoryRepository, ProductRepository, UnitOfWork};
    use rust_decimal::Decimal;

    /// Builder for a pre-populated in-memory catalog.
    ///
    /// Ids of created rows are recorded in creation order, so tests can refer
    /// to "the first category" as `fixture.categories[0]`.
    pub struct CatalogFixture {
        pub backend: MemBackend,
        pub categories: Vec<i64>,
        pub products: Vec<i64>,
    }

    impl Default for CatalogFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl CatalogFixture {
        pub fn new() -> Self {
            Self {
                backend: MemBackend::new(),
                categories: Vec::new(),
                products: Vec::new(),
            }
        }

        pub fn with_category(mut self, name: &str, fields: &[(&str, &str)]) -> Self {
            let category = Category::new(name, fields.iter().copied().collect());
            let mut session = ephemeral_session(&self.backend);
            let pending = session.add_category(category).unwrap();
            let report = session.commit().unwrap();
            self.categories.push(report.id_of(pending).unwrap());
            self
        }

        /// Add a product priced 1.00 to the `category`-th fixture category.
        pub fn with_product(mut self, category: usize, name: &str, fields: &[(&str, &str)]) -> Self {
            let fields: AttributeMap = fields.iter().copied().collect();
            let product =
                Product::new(name, Decimal::ONE, self.categories[category]).with_fields(fields);
            let mut session = ephemeral_session(&self.backend);
            let pending = session.add_product(product).unwrap();
            let report = session.commit().unwrap();
            self.products.push(report.id_of(pending).unwrap());
            self
        }
    }
}
