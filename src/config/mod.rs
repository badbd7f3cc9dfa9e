use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Fatal conditions detected before the server accepts traffic.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("Storage credentials missing: set STORAGE_CREDENTIALS or STORAGE_CREDENTIALS_FILE")]
    MissingCredentials,

    #[error("Failed to read credential file {path}: {source}")]
    CredentialFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed storage credentials: {0}")]
    MalformedCredentials(#[from] serde_json::Error),

    #[error("Object storage unreachable: {0}")]
    StorageUnreachable(String),

    #[error("Metadata database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Failed to prepare staging directory {path}: {source}")]
    StagingDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration for the upload relay
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Maximum size of the whole multipart request body in bytes (default: 16 MiB)
    pub max_upload_size: usize,

    /// Multipart field carrying the image (default: "file", cameras also send "photo")
    pub field_name: String,

    /// Local scratch directory for staged uploads (default: "uploads")
    pub staging_dir: PathBuf,

    /// Namespace segment for remote objects (default: "esp32cam")
    pub object_prefix: String,

    /// Upper bound on each remote storage call (default: 60 s)
    pub remote_timeout: Duration,

    /// Verbose logging
    pub debug: bool,

    /// Listen port (default: 5000)
    pub port: u16,

    /// Metadata database; records are only kept when set
    pub database_url: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 16 * 1024 * 1024, // 16 MiB
            field_name: "file".to_string(),
            staging_dir: PathBuf::from("uploads"),
            object_prefix: "esp32cam".to_string(),
            remote_timeout: Duration::from_secs(60),
            debug: false,
            port: 5000,
            database_url: None,
        }
    }
}

impl RelayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            field_name: env::var("UPLOAD_FIELD_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default.field_name),

            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.staging_dir),

            object_prefix: env::var("OBJECT_PREFIX")
                .ok()
                .map(|v| v.trim_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default.object_prefix),

            remote_timeout: env::var("REMOTE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(default.remote_timeout),

            debug: env::var("DEBUG")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.debug),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),

            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// Config for local runs and tests: staging under the given directory, short timeout
    pub fn development(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            remote_timeout: Duration::from_secs(10),
            debug: true,
            ..Self::default()
        }
    }
}

/// Static key pair for the object store, inline JSON or read from a file
#[derive(Debug, Clone, Deserialize)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl StorageCredentials {
    pub fn from_json(raw: &str) -> Result<Self, StartupError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, StartupError> {
        let raw = std::fs::read_to_string(path).map_err(|source| StartupError::CredentialFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Inline material wins over the file path when both are present.
    pub fn from_env() -> Result<Self, StartupError> {
        if let Ok(inline) = env::var("STORAGE_CREDENTIALS") {
            if !inline.trim().is_empty() {
                return Self::from_json(&inline);
            }
        }
        match env::var("STORAGE_CREDENTIALS_FILE") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path)),
            _ => Err(StartupError::MissingCredentials),
        }
    }
}

/// Connection settings for the S3-compatible object store
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    /// Custom endpoint (MinIO, GCS interop); AWS when unset
    pub endpoint: Option<String>,
    pub region: String,
    /// Base used to build public object URLs; derived from endpoint/bucket when unset
    pub public_base_url: Option<String>,
    pub credentials: StorageCredentials,
}

impl StorageSettings {
    pub fn from_env() -> Result<Self, StartupError> {
        let bucket = env::var("STORAGE_BUCKET")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(StartupError::MissingVar("STORAGE_BUCKET"))?;

        Ok(Self {
            bucket,
            endpoint: env::var("STORAGE_ENDPOINT").ok().filter(|v| !v.is_empty()),
            region: env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            public_base_url: env::var("STORAGE_PUBLIC_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            credentials: StorageCredentials::from_env()?,
        })
    }
}
