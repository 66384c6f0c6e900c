use crate::error::EntityServiceError;
use error_stack::Report;

pub type ServiceResult<T> = Result<T, Report<EntityServiceError>>;
pub type OptServiceResult<T> = Result<Option<T>, Report<EntityServiceError>>;

pub mod error;
pub mod relation;
pub mod service;

pub use relation::{ForeignKeyRelation, RelatedEntityFetcher, RelatedEntityResolver, Relation};
pub use service::EntityService;
