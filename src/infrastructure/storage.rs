use crate::config::{StartupError, StorageSettings};
use crate::services::storage::{ObjectStore, S3ObjectStore};
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Base URL objects are publicly served from.
pub fn public_base_url(settings: &StorageSettings) -> String {
    if let Some(base) = &settings.public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    match &settings.endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), settings.bucket),
        None => format!(
            "https://{}.s3.{}.amazonaws.com",
            settings.bucket, settings.region
        ),
    }
}

/// Builds the S3 client and confirms the bucket is reachable.
pub async fn setup_storage(
    settings: &StorageSettings,
    operation_timeout: Duration,
) -> Result<Arc<S3ObjectStore>, StartupError> {
    info!(
        "☁️  Object storage: {} (Bucket: {})",
        settings.endpoint.as_deref().unwrap_or("aws"),
        settings.bucket
    );

    let creds = &settings.credentials;
    let mut loader = aws_config::from_env()
        .region(Region::new(settings.region.clone()))
        .credentials_provider(Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            creds.session_token.clone(),
            None,
            "static",
        ))
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(Duration::from_secs(10))
                .operation_timeout(operation_timeout)
                .build(),
        );
    if let Some(endpoint) = &settings.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(settings.endpoint.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    let store = S3ObjectStore::new(
        s3_client,
        settings.bucket.clone(),
        public_base_url(settings),
    );

    store
        .ping()
        .await
        .map_err(|e| StartupError::StorageUnreachable(format!("{:#}", e)))?;
    info!("✅ Bucket '{}' is ready", store.bucket());

    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageCredentials;

    fn settings(endpoint: Option<&str>, public: Option<&str>) -> StorageSettings {
        StorageSettings {
            bucket: "captures".to_string(),
            endpoint: endpoint.map(str::to_string),
            region: "eu-west-1".to_string(),
            public_base_url: public.map(str::to_string),
            credentials: StorageCredentials {
                access_key_id: "key".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
        }
    }

    #[test]
    fn test_public_base_url_aws() {
        assert_eq!(
            public_base_url(&settings(None, None)),
            "https://captures.s3.eu-west-1.amazonaws.com"
        );
    }

    #[test]
    fn test_public_base_url_custom_endpoint() {
        assert_eq!(
            public_base_url(&settings(Some("http://minio:9000/"), None)),
            "http://minio:9000/captures"
        );
    }

    #[test]
    fn test_public_base_url_override() {
        assert_eq!(
            public_base_url(&settings(
                Some("https://storage.googleapis.com"),
                Some("https://cdn.example.com/")
            )),
            "https://cdn.example.com"
        );
    }
}
