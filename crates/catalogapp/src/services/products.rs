use super::{check_attributes, guarded, non_empty};
use crate::attributes::AttrFilter;
use crate::config::AttributePolicy;
use crate::dto::{ProductDto, ProductPostDto};
use crate::error::{CatalogError, Entity, Result};
use crate::model::{Category, Product};
use crate::store::{CategoryRepository, ProductRepository, UnitOfWork};
use tracing::{info, info_span};

/// Resolve the category a product points at.
fn owning_category<S: CategoryRepository>(session: &S, category_id: i64) -> Result<Category> {
    session.get_category(category_id).map_err(|err| match err {
        CatalogError::NotFound { .. } => CatalogError::CategoryNotFound(category_id),
        other => other,
    })
}

/// Field rules, then the category, then its attribute vocabulary.
fn admit<S: CategoryRepository>(
    session: &S,
    product: &Product,
    policy: AttributePolicy,
) -> Result<()> {
    product.validate()?;
    let category = owning_category(session, product.category_id)?;
    check_attributes(&category, &product.additional_fields, policy)
}

fn to_dtos(products: Vec<Product>) -> Vec<ProductDto> {
    products.into_iter().map(ProductDto::from).collect()
}

pub fn create<S>(session: &mut S, dto: ProductPostDto, policy: AttributePolicy) -> Result<ProductDto>
where
    S: CategoryRepository + ProductRepository + UnitOfWork,
{
    let _span = info_span!("create_product", category_id = dto.category_id).entered();
    guarded(|| {
        let mut product = dto.into_product(0);
        admit(session, &product, policy)?;

        let pending = session.add_product(product.clone())?;
        let report = session.commit()?;
        product.id = report
            .id_of(pending)
            .ok_or_else(|| CatalogError::Store("commit did not assign an id".into()))?;

        info!(id = product.id, "Created product");
        Ok(product.into())
    })
}

pub fn get_by_id<S: ProductRepository>(session: &S, id: i64) -> Result<ProductDto> {
    let _span = info_span!("get_product", id).entered();
    guarded(|| {
        let product = session.get_product(id)?;
        info!(id, "Product by id received");
        Ok(product.into())
    })
}

/// Every product, or the products of one category when `category_id` is set.
pub fn get_all<S: ProductRepository>(
    session: &S,
    category_id: Option<i64>,
) -> Result<Vec<ProductDto>> {
    let _span = info_span!("get_products", category_id).entered();
    guarded(|| {
        let products = non_empty(
            session.list_products(category_id)?,
            CatalogError::NoResults(Entity::Product),
        )?;
        info!(count = products.len(), "Products received");
        Ok(to_dtos(products))
    })
}

pub fn get_by_category<S: ProductRepository>(
    session: &S,
    category_id: i64,
) -> Result<Vec<ProductDto>> {
    let _span = info_span!("get_products_by_category", category_id).entered();
    guarded(|| {
        let products = non_empty(
            session.list_products(Some(category_id))?,
            CatalogError::NoResults(Entity::Product),
        )?;
        info!(count = products.len(), "Products by category received");
        Ok(to_dtos(products))
    })
}

/// Products of `category_id` satisfying every pair of `filter`.
pub fn get_by_filter<S: ProductRepository>(
    session: &S,
    category_id: i64,
    filter: &AttrFilter,
) -> Result<Vec<ProductDto>> {
    let _span = info_span!(
        "get_products_by_filter",
        category_id,
        pairs = filter.pairs().len()
    )
    .entered();
    guarded(|| {
        let products = non_empty(
            session.filter_products(category_id, filter)?,
            CatalogError::NoResults(Entity::Product),
        )?;
        info!(count = products.len(), "Filtered products received");
        Ok(to_dtos(products))
    })
}

/// Replace product `id` with `dto`, including moving it to another category.
pub fn update<S>(
    session: &mut S,
    id: i64,
    dto: ProductPostDto,
    policy: AttributePolicy,
) -> Result<ProductDto>
where
    S: CategoryRepository + ProductRepository + UnitOfWork,
{
    let _span = info_span!("update_product", id).entered();
    guarded(|| {
        let product = dto.into_product(id);
        session.get_product(id)?;
        admit(session, &product, policy)?;

        session.update_product(product.clone())?;
        session.commit()?;

        info!(id, "Updated product");
        Ok(product.into())
    })
}

pub fn delete<S>(session: &mut S, id: i64) -> Result<()>
where
    S: ProductRepository + UnitOfWork,
{
    let _span = info_span!("delete_product", id).entered();
    guarded(|| {
        session.get_product(id)?;
        session.delete_product(id)?;
        session.commit()?;

        info!(id, "Deleted product");
        Ok(())
    })
}
