//! # Service Layer
//!
//! Services hold the catalog's **business rules**. Each operation is a plain
//! function generic over the repository traits it needs, so it runs the same
//! against any [`crate::store::session::Session`].
//!
//! ## Responsibilities
//!
//! - Validate incoming DTOs ([`crate::model`] field rules)
//! - Resolve the referenced category and check attribute keys against its
//!   vocabulary under the configured [`AttributePolicy`]
//! - Stage writes on the repositories and commit them through the
//!   [`crate::store::UnitOfWork`] exactly once per operation
//! - Map entities to transport DTOs
//!
//! ## Outcomes
//!
//! Every operation returns a [`Result`]: a value, or one [`CatalogError`] whose
//! [`CatalogError::reasons`] lists what went wrong. Collections that come back
//! empty are reported as [`CatalogError::NoResults`], on every endpoint.
//!
//! Raw storage failures (`Io`, `Serialization`, `Store`) never leave this
//! layer as such: they are logged at error level and converted into
//! [`CatalogError::Persistence`]. Domain failures are logged at warn level and
//! returned unchanged.
//!
//! ## Modules
//!
//! - [`categories`]: create, read, list, update, delete categories
//! - [`products`]: product CRUD plus the by-category and by-filter queries

use crate::attributes::AttributeMap;
use crate::config::AttributePolicy;
use crate::error::{CatalogError, Result};
use crate::model::Category;
use tracing::{debug, error, warn};

pub mod categories;
pub mod products;

/// Run one service operation and apply the boundary conversion to its failure.
pub(crate) fn guarded<T>(op: impl FnOnce() -> Result<T>) -> Result<T> {
    op().map_err(|err| {
        if err.is_infrastructure() {
            error!(error = %err, "storage failure");
            return CatalogError::Persistence(err.to_string());
        }
        match &err {
            CatalogError::Cancelled => debug!("operation cancelled"),
            other => warn!(error = %other, "operation failed"),
        }
        err
    })
}

/// An empty collection is a `NoResults` failure.
pub(crate) fn non_empty<T>(items: Vec<T>, err: CatalogError) -> Result<Vec<T>> {
    if items.is_empty() {
        return Err(err);
    }
    Ok(items)
}

/// Check product attribute keys against the category vocabulary.
pub(crate) fn check_attributes(
    category: &Category,
    fields: &AttributeMap,
    policy: AttributePolicy,
) -> Result<()> {
    let unknown = category.unknown_keys(fields);
    if unknown.is_empty() {
        return Ok(());
    }
    match policy {
        AttributePolicy::Reject => Err(CatalogError::InvalidAdditionalField(unknown)),
        AttributePolicy::Warn => {
            warn!(
                category_id = category.id,
                fields = %unknown.join(", "),
                "Invalid additional fields"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;

    #[test]
    fn infrastructure_errors_become_persistence() {
        let result: Result<()> = guarded(|| Err(CatalogError::Store("disk full".into())));
        match result {
            Err(CatalogError::Persistence(msg)) => assert!(msg.contains("disk full")),
            other => panic!("Expected Persistence, got {:?}", other),
        }
    }

    #[test]
    fn domain_errors_pass_through() {
        let result: Result<()> = guarded(|| Err(CatalogError::not_found(Entity::Product, 3)));
        assert!(matches!(result, Err(CatalogError::NotFound { id: 3, .. })));

        let result: Result<()> = guarded(|| Err(CatalogError::Cancelled));
        assert!(matches!(result, Err(CatalogError::Cancelled)));
    }

    #[test]
    fn empty_collections_fail() {
        assert!(matches!(
            non_empty(Vec::<i64>::new(), CatalogError::NoResults(Entity::Product)),
            Err(CatalogError::NoResults(Entity::Product))
        ));
        assert_eq!(
            non_empty(vec![1], CatalogError::NoResults(Entity::Product)).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn attribute_policy_decides_on_unknown_keys() {
        let category = Category::new("Phones", [("color", "black")].into_iter().collect());
        let fields: AttributeMap = [("ram", "8GB"), ("color", "red")].into_iter().collect();

        match check_attributes(&category, &fields, AttributePolicy::Reject) {
            Err(CatalogError::InvalidAdditionalField(keys)) => assert_eq!(keys, vec!["ram"]),
            other => panic!("Expected InvalidAdditionalField, got {:?}", other),
        }
        assert!(check_attributes(&category, &fields, AttributePolicy::Warn).is_ok());
    }

    #[test]
    fn known_keys_always_pass() {
        let category = Category::new("Phones", [("color", "")].into_iter().collect());
        let fields: AttributeMap = [("color", "blue")].into_iter().collect();
        assert!(check_attributes(&category, &fields, AttributePolicy::Reject).is_ok());
        assert!(check_attributes(&category, &AttributeMap::new(), AttributePolicy::Reject).is_ok());
    }
}
