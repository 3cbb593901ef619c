use std::fmt;
use thiserror::Error;

/// The two persisted entity kinds, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Category,
    Product,
}

impl Entity {
    pub fn plural(&self) -> &'static str {
        match self {
            Entity::Category => "categories",
            Entity::Product => "products",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Category => write!(f, "Category"),
            Entity::Product => write!(f, "Product"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{entity} with id {id} does not exist.")]
    NotFound { entity: Entity, id: i64 },

    #[error("Category with id {0} does not exist.")]
    CategoryNotFound(i64),

    #[error("Invalid additional fields: {}", .0.join(", "))]
    InvalidAdditionalField(Vec<String>),

    #[error("No {} found", .0.plural())]
    NoResults(Entity),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl CatalogError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        CatalogError::NotFound { entity, id }
    }

    /// Raw failures from the persistence layer, as opposed to domain outcomes.
    /// These never cross the service boundary unconverted.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            CatalogError::Io(_) | CatalogError::Serialization(_) | CatalogError::Store(_)
        )
    }

    /// Expands the failure into the individual reasons a caller should see.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            CatalogError::InvalidAdditionalField(keys) => keys
                .iter()
                .map(|key| format!("Invalid additional field: {}", key))
                .collect(),
            CatalogError::Validation(reasons) => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
