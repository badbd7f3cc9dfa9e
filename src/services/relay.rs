use crate::config::RelayConfig;
use crate::services::metadata::{MetadataStore, NewCaptureRecord};
use crate::services::staging::{BodyLimitExceeded, StagedFile, generate_capture_name};
use crate::services::storage::{ObjectStore, ObjectSummary};
use crate::utils::validation::{ValidationError, normalize_content_type, validate_image_filename};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use utoipa::ToSchema;

/// Failure kinds of the relay pipeline, classified once at the HTTP boundary.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Payload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },

    #[error("Staging failed: {0}")]
    Staging(String),

    #[error("Remote transfer failed: {0}")]
    RemoteTransfer(String),

    #[error("Metadata append failed: {0}")]
    Metadata(String),
}

/// One inbound file part.
pub struct UploadRequest<R> {
    pub filename_hint: Option<String>,
    pub content_type: Option<String>,
    pub body: R,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Staged, stored remotely and made public.
    Stored {
        filename: String,
        url: String,
        size: u64,
        /// Set when the metadata index could not be updated
        metadata_warning: Option<String>,
    },
    /// Received locally but the remote step failed.
    Received {
        filename: String,
        size: u64,
        error: String,
    },
}

/// Listing entry under the capture prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RemoteObject {
    pub name: String,
    pub size: i64,
    pub created: Option<DateTime<Utc>>,
    pub url: String,
}

pub struct RelayService {
    storage: Arc<dyn ObjectStore>,
    metadata: Option<Arc<dyn MetadataStore>>,
    config: RelayConfig,
}

impl RelayService {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        metadata: Option<Arc<dyn MetadataStore>>,
        config: RelayConfig,
    ) -> Self {
        Self {
            storage,
            metadata,
            config,
        }
    }

    pub fn metadata_enabled(&self) -> bool {
        self.metadata.is_some()
    }

    fn object_key(&self, filename: &str) -> String {
        format!("{}/{}", self.config.object_prefix, filename)
    }

    pub async fn upload<R>(&self, request: UploadRequest<R>) -> Result<UploadOutcome, RelayError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let ext = validate_image_filename(request.filename_hint.as_deref())?;
        let content_type = normalize_content_type(request.content_type.as_deref());
        tracing::info!(
            "📁 Received {:?} (.{}, {})",
            request.filename_hint.as_deref().unwrap_or_default(),
            ext,
            content_type
        );

        let staged = self.stage(request.body).await?;
        let filename = staged.name().to_string();
        let size = staged.size();

        let outcome = match self.transfer(&staged, &content_type).await {
            Ok(url) => {
                tracing::info!("✅ Stored {} at {}", filename, url);
                let metadata_warning = self
                    .record(&filename, &url)
                    .await
                    .err()
                    .map(|e| e.to_string());
                UploadOutcome::Stored {
                    filename,
                    url,
                    size,
                    metadata_warning,
                }
            }
            Err(e) => {
                tracing::error!("❌ {} received but not archived: {}", filename, e);
                UploadOutcome::Received {
                    filename,
                    size,
                    error: e.to_string(),
                }
            }
        };

        staged.remove().await;
        Ok(outcome)
    }

    /// Streams the body into a fresh staged file and verifies it landed intact.
    async fn stage<R>(&self, body: R) -> Result<StagedFile, RelayError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let limit = self.config.max_upload_size;
        let (mut staged, mut file) =
            StagedFile::create(&self.config.staging_dir, generate_capture_name())
                .await
                .map_err(|e| RelayError::Staging(format!("could not create staged file: {}", e)))?;

        // One byte past the limit is enough to detect an oversized body
        let mut limited = body.take(limit as u64 + 1);
        let written = match tokio::io::copy(&mut limited, &mut file).await {
            Ok(n) => n,
            Err(e) => {
                drop(file);
                staged.remove().await;
                if BodyLimitExceeded::is_cause_of(&e) {
                    return Err(RelayError::PayloadTooLarge { limit });
                }
                return Err(RelayError::Staging(format!("failed reading upload: {}", e)));
            }
        };

        if written > limit as u64 {
            drop(file);
            staged.remove().await;
            return Err(RelayError::PayloadTooLarge { limit });
        }

        if let Err(e) = file.sync_all().await {
            drop(file);
            staged.remove().await;
            return Err(RelayError::Staging(format!("failed flushing upload: {}", e)));
        }
        drop(file);

        match staged.verify().await {
            Ok(size) => {
                tracing::info!("💾 Staged {} ({} bytes)", staged.name(), size);
                Ok(staged)
            }
            Err(reason) => {
                staged.remove().await;
                Err(RelayError::Staging(reason))
            }
        }
    }

    /// Uploads, publishes and resolves the public URL of a staged file.
    async fn transfer(&self, staged: &StagedFile, content_type: &str) -> Result<String, RelayError> {
        let key = self.object_key(staged.name());
        tracing::info!("☁️ Uploading {} to object storage", key);

        self.bounded(
            "upload",
            self.storage.put_file(&key, staged.path(), content_type),
        )
        .await?;
        self.bounded("make public", self.storage.make_public(&key))
            .await?;

        Ok(self.storage.public_url(&key))
    }

    async fn record(&self, filename: &str, url: &str) -> Result<(), RelayError> {
        let Some(metadata) = &self.metadata else {
            return Ok(());
        };

        let record = NewCaptureRecord {
            filename: filename.to_string(),
            url: url.to_string(),
        };
        let timeout = self.config.remote_timeout;
        match tokio::time::timeout(timeout, metadata.append(record)).await {
            Ok(Ok(())) => {
                tracing::info!("🗂️ Indexed {}", filename);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("❌ Metadata append for {} failed: {:#}", filename, e);
                Err(RelayError::Metadata(format!("{:#}", e)))
            }
            Err(_) => {
                tracing::error!("❌ Metadata append for {} timed out", filename);
                Err(RelayError::Metadata(format!("timed out after {:?}", timeout)))
            }
        }
    }

    /// Runs one remote call under the configured timeout.
    async fn bounded<F>(&self, op: &str, call: F) -> Result<(), RelayError>
    where
        F: Future<Output = anyhow::Result<()>>,
    {
        let timeout = self.config.remote_timeout;
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RelayError::RemoteTransfer(format!("{} failed: {:#}", op, e))),
            Err(_) => Err(RelayError::RemoteTransfer(format!(
                "{} timed out after {:?}",
                op, timeout
            ))),
        }
    }

    /// Snapshot of everything under the capture prefix, newest first.
    pub async fn list_files(&self) -> Result<Vec<RemoteObject>, RelayError> {
        let prefix = format!("{}/", self.config.object_prefix);
        let timeout = self.config.remote_timeout;
        let summaries = match tokio::time::timeout(timeout, self.storage.list_objects(&prefix)).await
        {
            Ok(Ok(summaries)) => summaries,
            Ok(Err(e)) => return Err(RelayError::RemoteTransfer(format!("list failed: {:#}", e))),
            Err(_) => {
                return Err(RelayError::RemoteTransfer(format!(
                    "list timed out after {:?}",
                    timeout
                )));
            }
        };

        let mut objects: Vec<RemoteObject> = summaries
            .into_iter()
            .map(|ObjectSummary { key, size, created }| RemoteObject {
                url: self.storage.public_url(&key),
                name: key,
                size,
                created,
            })
            .collect();
        sort_newest_first(&mut objects);
        Ok(objects)
    }
}

/// Orders by creation time descending; undated entries go last, ties by name.
pub fn sort_newest_first(objects: &mut [RemoteObject]) {
    objects.sort_by(|a, b| {
        // None < Some, so comparing b to a puts None at the end
        b.created
            .cmp(&a.created)
            .then_with(|| a.name.cmp(&b.name))
    });
}
