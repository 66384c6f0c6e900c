use crate::error::ErrorResponse;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use engine::Entity;
use engine::envelope::{Envelope, to_json};
use tracing::error;

/// A single envelope, serialized with the envelope's own field order.
pub struct EnvelopeResponse<E: Entity> {
    status_code: StatusCode,
    envelope: Envelope<E>,
}

impl<E: Entity> EnvelopeResponse<E> {
    pub fn ok(envelope: Envelope<E>) -> Self {
        Self {
            status_code: StatusCode::OK,
            envelope,
        }
    }
}

impl<E: Entity> IntoResponse for EnvelopeResponse<E> {
    fn into_response(self) -> Response {
        match to_json(&self.envelope) {
            Ok(body) => (
                self.status_code,
                [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
                body,
            )
                .into_response(),
            Err(e) => {
                error!("failed to serialize {} envelope: {e:?}", E::NAME);
                ErrorResponse::internal().into_response()
            }
        }
    }
}
