use crate::services::relay::RelayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::any::Any;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Bad Gateway: {message} ({details})")]
    BadGateway { message: String, details: String },

    #[error("Internal Server Error: {message} ({details})")]
    Internal { message: String, details: String },
}

impl From<RelayError> for AppError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::Validation(e) => AppError::BadRequest(e.message),
            RelayError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Request body too large (max {} bytes)",
                limit
            )),
            RelayError::Staging(details) => AppError::Internal {
                message: "Error saving file".to_string(),
                details,
            },
            RelayError::RemoteTransfer(details) => AppError::BadGateway {
                message: "Object storage request failed".to_string(),
                details,
            },
            RelayError::Metadata(details) => AppError::Internal {
                message: "Metadata database request failed".to_string(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => {
                tracing::warn!("⚠️ Rejected upload: {}", msg);
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            AppError::PayloadTooLarge(msg) => {
                tracing::warn!("⚠️ {}", msg);
                (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": msg }))
            }
            AppError::BadGateway { message, details } => {
                tracing::error!("❌ {}: {}", message, details);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": message, "details": details }),
                )
            }
            AppError::Internal { message, details } => {
                tracing::error!("❌ {}: {}", message, details);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": message, "details": details }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Generic 500 for a handler that panicked; the panic text is logged, never returned.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!("💥 Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::ValidationError;

    #[test]
    fn test_relay_error_classification() {
        let cases = [
            (
                RelayError::Validation(ValidationError::missing_part("file")),
                StatusCode::BAD_REQUEST,
            ),
            (
                RelayError::PayloadTooLarge { limit: 10 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                RelayError::Staging("disk full".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RelayError::RemoteTransfer("list failed".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Metadata("db down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_payload_too_large_names_request_body() {
        let AppError::PayloadTooLarge(msg) = AppError::from(RelayError::PayloadTooLarge { limit: 1024 })
        else {
            panic!("expected PayloadTooLarge");
        };
        assert_eq!(msg, "Request body too large (max 1024 bytes)");
    }

    #[test]
    fn test_panic_response_hides_payload() {
        let response = panic_response(Box::new("secret staging path /srv/uploads".to_string()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }
}
