//! End-to-end flows through the facade over the file backend.

use catalogapp::attributes::AttributeMap;
use catalogapp::config::AttributePolicy;
use catalogapp::dto::{CategoryPostDto, ProductPostDto};
use catalogapp::error::{CatalogError, Entity};
use catalogapp::test_utils::TestEnv;
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

fn fields(pairs: &[(&str, &str)]) -> Option<AttributeMap> {
    Some(pairs.iter().copied().collect())
}

fn category(name: &str, pairs: &[(&str, &str)]) -> CategoryPostDto {
    CategoryPostDto {
        name: name.into(),
        additional_fields: fields(pairs),
    }
}

fn product(name: &str, category_id: i64, pairs: &[(&str, &str)]) -> ProductPostDto {
    ProductPostDto {
        name: name.into(),
        description: Some(format!("{} description", name)),
        price: Decimal::new(79900, 2),
        category_id,
        additional_fields: fields(pairs),
    }
}

#[test]
fn phones_vocabulary_scenario() {
    let env = TestEnv::new();
    let api = &env.api;
    let cancel = CancellationToken::new();

    let phones = api
        .create_category(category("Phones", &[("color", "black")]), &cancel)
        .unwrap();

    let x = api
        .create_product(product("X", phones.id, &[("color", "black")]), &cancel)
        .unwrap();
    assert!(x.id > 0);

    let err = api
        .create_product(product("Y", phones.id, &[("ram", "8GB")]), &cancel)
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidAdditionalField(_)));
    assert_eq!(err.reasons(), vec!["Invalid additional field: ram"]);

    assert_eq!(api.products_by_category(phones.id, &cancel).unwrap().len(), 1);
}

#[test]
fn category_fallback_scenario() {
    let env = TestEnv::new();
    let api = &env.api;
    let cancel = CancellationToken::new();

    let c = api
        .create_category(category("Phones", &[("color", "black")]), &cancel)
        .unwrap();
    api.create_product(product("Own", c.id, &[("color", "black")]), &cancel)
        .unwrap();
    api.create_product(product("Inherited", c.id, &[]), &cancel)
        .unwrap();

    let found = api
        .products_by_filter(c.id, [("color", "black")].into_iter().collect(), &cancel)
        .unwrap();
    assert_eq!(found.len(), 2);

    let found = api
        .products_by_filter(c.id, [("color", "white")].into_iter().collect(), &cancel)
        .unwrap_err();
    assert!(matches!(found, CatalogError::NoResults(Entity::Product)));
}

#[test]
fn product_value_mismatch_still_falls_back_to_category() {
    let env = TestEnv::new();
    let api = &env.api;
    let cancel = CancellationToken::new();

    let c = api
        .create_category(category("Phones", &[("color", "black")]), &cancel)
        .unwrap();
    api.create_product(product("Red", c.id, &[("color", "red")]), &cancel)
        .unwrap();

    // Each side is consulted independently; the category still says black.
    let found = api
        .products_by_filter(c.id, [("color", "black")].into_iter().collect(), &cancel)
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Red");
}

#[test]
fn ids_are_not_reused_after_delete() {
    let env = TestEnv::new();
    let api = &env.api;
    let cancel = CancellationToken::new();

    let c = api.create_category(category("C", &[]), &cancel).unwrap();
    let first = api.create_product(product("A", c.id, &[]), &cancel).unwrap();
    api.delete_product(first.id, &cancel).unwrap();
    let second = api.create_product(product("B", c.id, &[]), &cancel).unwrap();

    assert!(second.id > first.id);
}

#[test]
fn state_survives_reopening_the_file() {
    let env = TestEnv::new();
    let cancel = CancellationToken::new();

    let c = env
        .api
        .create_category(category("Phones", &[("color", "black")]), &cancel)
        .unwrap();
    let p = env
        .api
        .create_product(product("X", c.id, &[("color", "black")]), &cancel)
        .unwrap();

    let api = env.reopen();
    assert_eq!(api.policy(), AttributePolicy::Reject);
    let p = api.product(p.id, &cancel).unwrap();
    assert_eq!(p.category_id, c.id);
    assert_eq!(p.price, Decimal::new(79900, 2));
    assert_eq!(p.description.as_deref(), Some("X description"));
    assert_eq!(p.additional_fields, fields(&[("color", "black")]));
}

#[test]
fn restricted_category_delete_then_cleanup() {
    let env = TestEnv::new();
    let api = &env.api;
    let cancel = CancellationToken::new();

    let c = api.create_category(category("C", &[]), &cancel).unwrap();
    let p = api.create_product(product("P", c.id, &[]), &cancel).unwrap();

    assert!(matches!(
        api.delete_category(c.id, &cancel),
        Err(CatalogError::Persistence(_))
    ));

    api.delete_product(p.id, &cancel).unwrap();
    api.delete_category(c.id, &cancel).unwrap();
    assert!(matches!(
        api.category(c.id, &cancel),
        Err(CatalogError::NotFound { .. })
    ));
}
