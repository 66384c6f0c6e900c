use engine::error::{FilterError, QueryError};
use error_stack::Report;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityServiceError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot convert '{raw}' for field '{field}'")]
    TypeConversion { field: String, raw: String },
    #[error("the requested entity does not exist")]
    NotFound,
    #[error("failed to fetch required related entities '{0}'")]
    RelationFetch(String),
    #[error("the repository failed")]
    Storage,
}

impl EntityServiceError {
    pub fn invalid(message: impl Into<String>) -> Self {
        EntityServiceError::InvalidArgument(message.into())
    }
}

/// Conversion failures become `TypeConversion`, anything else wrong with the
/// filter is an `InvalidArgument`.
pub(crate) fn from_filter(report: Report<FilterError>) -> Report<EntityServiceError> {
    let context = match report.current_context() {
        FilterError::Conversion { field, raw } => EntityServiceError::TypeConversion {
            field: field.clone(),
            raw: raw.clone(),
        },
        other => EntityServiceError::invalid(other.to_string()),
    };
    report.change_context(context)
}

pub(crate) fn from_query(report: Report<QueryError>) -> Report<EntityServiceError> {
    let context = EntityServiceError::invalid(report.current_context().to_string());
    report.change_context(context)
}

/// Failure to fetch one relation. Never leaves the resolver unless the
/// relation is required.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch related entities")]
pub struct RelationFetchError;
