use super::{guarded, non_empty};
use crate::dto::{CategoryDto, CategoryPostDto};
use crate::error::{CatalogError, Entity, Result};
use crate::store::{CategoryRepository, UnitOfWork};
use tracing::{info, info_span};

pub fn create<S>(session: &mut S, dto: CategoryPostDto) -> Result<CategoryDto>
where
    S: CategoryRepository + UnitOfWork,
{
    let _span = info_span!("create_category").entered();
    guarded(|| {
        let mut category = dto.into_category(0);
        category.validate()?;

        let pending = session.add_category(category.clone())?;
        let report = session.commit()?;
        category.id = report
            .id_of(pending)
            .ok_or_else(|| CatalogError::Store("commit did not assign an id".into()))?;

        info!(id = category.id, name = %category.name, "Created category");
        Ok(category.into())
    })
}

pub fn get_by_id<S: CategoryRepository>(session: &S, id: i64) -> Result<CategoryDto> {
    let _span = info_span!("get_category", id).entered();
    guarded(|| {
        let category = session.get_category(id)?;
        info!(id, "Category received");
        Ok(category.into())
    })
}

pub fn get_all<S: CategoryRepository>(session: &S) -> Result<Vec<CategoryDto>> {
    let _span = info_span!("get_categories").entered();
    guarded(|| {
        let categories = non_empty(
            session.list_categories()?,
            CatalogError::NoResults(Entity::Category),
        )?;
        info!(count = categories.len(), "Categories received");
        Ok(categories.into_iter().map(CategoryDto::from).collect())
    })
}

/// Replace name and vocabulary of category `id`.
///
/// Products already using keys the new vocabulary drops are left untouched;
/// the check only applies to later product writes.
pub fn update<S>(session: &mut S, id: i64, dto: CategoryPostDto) -> Result<CategoryDto>
where
    S: CategoryRepository + UnitOfWork,
{
    let _span = info_span!("update_category", id).entered();
    guarded(|| {
        let category = dto.into_category(id);
        category.validate()?;

        session.update_category(category.clone())?;
        session.commit()?;

        info!(id, "Updated category");
        Ok(category.into())
    })
}

pub fn delete<S>(session: &mut S, id: i64) -> Result<()>
where
    S: CategoryRepository + UnitOfWork,
{
    let _span = info_span!("delete_category", id).entered();
    guarded(|| {
        session.get_category(id)?;
        session.delete_category(id)?;
        session.commit()?;

        info!(id, "Deleted category");
        Ok(())
    })
}
