use crate::AppState;
use crate::api::error::AppError;
use crate::services::relay::{RelayError, RemoteObject, UploadOutcome, UploadRequest};
use crate::services::staging::BodyLimitExceeded;
use crate::utils::validation::ValidationError;
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, StatusCode, header},
};
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    PartialSuccess,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub status: UploadStatus,
    pub message: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub size: u64,
    /// Remote failure detail on partial success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Metadata index failure on an otherwise successful upload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Stored {
                filename,
                url,
                size,
                metadata_warning,
            } => Self {
                status: UploadStatus::Success,
                message: "File uploaded successfully".to_string(),
                filename,
                url: Some(url),
                size,
                error: None,
                warning: metadata_warning,
            },
            UploadOutcome::Received {
                filename,
                size,
                error,
            } => Self {
                status: UploadStatus::PartialSuccess,
                message: "File received but object storage upload failed".to_string(),
                filename,
                url: None,
                size,
                error: Some(error),
                warning: None,
            },
        }
    }
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE || err.body_text().contains("length limit exceeded") {
        RelayError::PayloadTooLarge { limit }.into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}

fn body_read_error(err: MultipartError) -> std::io::Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BodyLimitExceeded.into_io_error()
    } else {
        std::io::Error::other(err)
    }
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = Multipart, description = "Image file in the configured field (default `file`)"),
    responses(
        (status = 200, description = "Stored, or received with a partial_success status", body = UploadResponse),
        (status = 400, description = "Missing file part or disallowed extension"),
        (status = 413, description = "Request body exceeds the upload limit"),
        (status = 500, description = "Staging failed")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = state.config.max_upload_size;
    let field_name = state.config.field_name.as_str();
    let declared_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared_length.is_some_and(|len| len > limit as u64) {
        return Err(RelayError::PayloadTooLarge { limit }.into());
    }

    // Not multipart/form-data at all, so there is no file part to find
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Multipart rejected: {}", rejection.body_text());
        AppError::from(RelayError::from(ValidationError::missing_part(field_name)))
    })?;

    tracing::info!("📤 Starting upload...");

    let result: Result<UploadOutcome, AppError> = async {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limit))?
        {
            if field.name() != Some(field_name) {
                continue;
            }

            let request = UploadRequest {
                filename_hint: field.file_name().map(str::to_string),
                content_type: field.content_type().map(str::to_string),
                body: StreamReader::new(field.map_err(body_read_error)),
            };
            return state.relay.upload(request).await.map_err(AppError::from);
        }

        Err(RelayError::from(ValidationError::missing_part(field_name)).into())
    }
    .await;

    match result {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            // Drain the rest of the body so the client sees our response instead of a reset
            if !matches!(e, AppError::PayloadTooLarge(_)) {
                while let Ok(Some(mut field)) = multipart.next_field().await {
                    while let Ok(Some(_)) = field.chunk().await {}
                }
            }
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/list-files",
    responses(
        (status = 200, description = "Captures under the object prefix, newest first", body = Vec<RemoteObject>),
        (status = 502, description = "Object storage listing failed")
    ),
    tag = "files"
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<RemoteObject>>, AppError> {
    let files = state.relay.list_files().await?;
    tracing::info!("📋 Listed {} file(s)", files.len());
    Ok(Json(files))
}
