use crate::field::FieldKind;
use error_stack::Report;

pub type ConversionResult<T> = Result<T, Report<ConversionError>>;
pub type FilterResult<T> = Result<T, Report<FilterError>>;
pub type QueryResult<T> = Result<T, Report<QueryError>>;
pub type RepoResult<T> = Result<T, Report<RepoError>>;
pub type OptRepoResult<T> = Result<Option<T>, Report<RepoError>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert '{raw}' into {kind} for field '{field}'")]
pub struct ConversionError {
    pub field: String,
    pub raw: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unexpected end of filter")]
    UnexpectedEnd,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("'{field}' is not a field of {entity}")]
    UnknownField { field: String, entity: &'static str },
    #[error("operator '{op}' cannot be applied to field '{field}'")]
    UnsupportedOperator { field: String, op: String },
    #[error("cannot convert '{raw}' for field '{field}'")]
    Conversion { field: String, raw: String },
    #[error("filter nests deeper than {0} levels")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value '{value}' for query parameter '{key}'")]
pub struct QueryError {
    pub key: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("failed to count entities")]
    Count,
    #[error("failed to get entity")]
    Get,
    #[error("failed to list entities")]
    List,
    #[error("failed to create entity")]
    Create,
    #[error("failed to update entity")]
    Update,
    #[error("failed to delete entity")]
    Delete,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to serialize envelope")]
pub struct SerializeError;
