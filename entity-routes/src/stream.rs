use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_streams::StreamBodyAs;
use serde::Serialize;

/// A JSON array body written element by element.
pub struct StreamingResponse {
    status_code: StatusCode,
    body: StreamBodyAs<'static>,
}

impl StreamingResponse {
    pub fn ok<T>(items: Vec<T>) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::with_status(StatusCode::OK, items)
    }

    pub fn created<T>(items: Vec<T>) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::with_status(StatusCode::CREATED, items)
    }

    fn with_status<T>(status_code: StatusCode, items: Vec<T>) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            status_code,
            body: StreamBodyAs::json_array(tokio_stream::iter(items)),
        }
    }
}

impl IntoResponse for StreamingResponse {
    fn into_response(self) -> Response {
        (self.status_code, self.body).into_response()
    }
}
