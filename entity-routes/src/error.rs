use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use entity_service::error::EntityServiceError;
use error_stack::Report;
use serde::Serialize;
use std::borrow::Cow;
use tracing::error;

/// A failed endpoint. Client mistakes become 4xx with the reason in the body;
/// everything else is logged and returned as a bare 500 message.
#[derive(thiserror::Error)]
#[error("there was an error running the endpoint")]
pub struct EndpointError(Report<EntityServiceError>);

impl std::fmt::Debug for EndpointError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Report<EntityServiceError>> for EndpointError {
    fn from(value: Report<EntityServiceError>) -> Self {
        Self(value)
    }
}

impl IntoResponse for EndpointError {
    fn into_response(self) -> Response {
        let context = self.0.current_context();
        match context {
            EntityServiceError::InvalidArgument(_) | EntityServiceError::TypeConversion { .. } => {
                ErrorResponse::new(StatusCode::BAD_REQUEST, context.to_string()).into_response()
            }
            EntityServiceError::NotFound => ErrorResponse::not_found().into_response(),
            EntityServiceError::RelationFetch(_) | EntityServiceError::Storage => {
                error!("request failed: {:?}", self.0);
                ErrorResponse::internal().into_response()
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip)]
    status_code: StatusCode,
    message: Cow<'static, str>,
}

impl ErrorResponse {
    pub fn new(status_code: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "the requested entity does not exist")
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "the request could not be completed",
        )
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}
