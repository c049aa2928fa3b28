//! Custom error types for the API service

use std::io;

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use media::IngestError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Ingestion or playback failure
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl ApiError {
    fn status_and_category(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "auth"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store"),
            ApiError::Ingest(err) => {
                let status = match err {
                    IngestError::NotFound(_) => StatusCode::NOT_FOUND,
                    IngestError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    IngestError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    IngestError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    IngestError::Body(source) => body_read_status(source),
                    IngestError::Upload(_) => StatusCode::BAD_GATEWAY,
                    IngestError::Io(_)
                    | IngestError::Probe(_)
                    | IngestError::Transcode(_)
                    | IngestError::Persist { .. }
                    | IngestError::Sign(_)
                    | IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.category())
            }
        }
    }
}

/// Status for an upload body that failed mid-read.
///
/// Multipart failures keep their own status (413 past the body limit),
/// anything else is the client's fault.
fn body_read_status(source: &io::Error) -> StatusCode {
    source
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .map(MultipartError::status)
        .unwrap_or(StatusCode::BAD_REQUEST)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category) = self.status_and_category();

        if status.is_server_error() {
            error!(category, "Request failed: {}", self);
        }

        let message = match &self {
            ApiError::Database(_) => "Database error".to_string(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "category": category,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn ingest_errors_map_to_status_codes() {
        let id = Uuid::new_v4();
        let cases = [
            (IngestError::NotFound(id), StatusCode::NOT_FOUND),
            (IngestError::Unauthorized(id), StatusCode::FORBIDDEN),
            (
                IngestError::UnsupportedMediaType("video/webm".to_string()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                IngestError::PayloadTooLarge { limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn unreadable_body_is_a_client_error() {
        let err = IngestError::Body(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "client went away",
        ));
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unauthorized_is_401() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
