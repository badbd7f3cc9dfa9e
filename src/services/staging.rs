use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

/// Prefix of every generated capture name
pub const CAPTURE_NAME_PREFIX: &str = "esp32cam_";

/// Marker carried inside an `io::Error` when the request body outgrows the upload limit.
#[derive(Error, Debug)]
#[error("request body exceeds the upload limit")]
pub struct BodyLimitExceeded;

impl BodyLimitExceeded {
    pub fn into_io_error(self) -> io::Error {
        io::Error::other(self)
    }

    pub fn is_cause_of(err: &io::Error) -> bool {
        err.get_ref().is_some_and(|inner| inner.is::<BodyLimitExceeded>())
    }
}

/// Generates `esp32cam_<token>.jpg` from a random v4 UUID (122 random bits).
pub fn generate_capture_name() -> String {
    format!("{}{}.jpg", CAPTURE_NAME_PREFIX, Uuid::new_v4().simple())
}

/// A request-owned file in the staging directory.
///
/// The file is removed by [`StagedFile::remove`] or, if the owning future is
/// dropped first, synchronously in `Drop`.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    path: PathBuf,
    size: u64,
    released: bool,
}

impl StagedFile {
    /// Creates the file exclusively; an existing file with the same name is an error.
    pub async fn create(dir: &Path, name: String) -> io::Result<(Self, File)> {
        let path = dir.join(&name);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok((
            Self {
                name,
                path,
                size: 0,
                released: false,
            },
            file,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Re-reads the file from disk and records its size.
    pub async fn verify(&mut self) -> Result<u64, String> {
        let meta = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| format!("staged file {} missing after write: {}", self.name, e))?;

        if meta.len() == 0 {
            return Err(format!("staged file {} is empty", self.name));
        }

        self.size = meta.len();
        Ok(self.size)
    }

    pub async fn remove(mut self) {
        self.released = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => tracing::debug!("🧹 Removed staged file {}", self.name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("⚠️ Failed to remove staged file {}: {}", self.name, e),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("🧹 Removed abandoned staged file {}", self.name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "⚠️ Failed to remove abandoned staged file {}: {}",
                self.name,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_capture_name_shape() {
        let name = generate_capture_name();
        assert!(name.starts_with(CAPTURE_NAME_PREFIX));
        assert!(name.ends_with(".jpg"));
        let token = &name[CAPTURE_NAME_PREFIX.len()..name.len() - 4];
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_concurrent_names_never_collide() {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                std::thread::spawn(|| (0..1_000).map(|_| generate_capture_name()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name), "duplicate capture name generated");
            }
        }
        assert_eq!(seen.len(), 16_000);
    }

    #[tokio::test]
    async fn test_create_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let (_staged, _file) = StagedFile::create(dir.path(), "dup.jpg".to_string())
            .await
            .unwrap();
        let err = StagedFile::create(dir.path(), "dup.jpg".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_verify_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let (mut staged, mut file) = StagedFile::create(dir.path(), generate_capture_name())
            .await
            .unwrap();
        file.write_all(b"\xFF\xD8\xFFjpeg").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        assert_eq!(staged.verify().await.unwrap(), 7);
        assert_eq!(staged.size(), 7);

        let path = staged.path().to_path_buf();
        staged.remove().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_verify_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut staged, file) = StagedFile::create(dir.path(), generate_capture_name())
            .await
            .unwrap();
        drop(file);
        assert!(staged.verify().await.unwrap_err().contains("empty"));
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (staged, file) = StagedFile::create(dir.path(), generate_capture_name())
            .await
            .unwrap();
        drop(file);
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_body_limit_marker() {
        let err = BodyLimitExceeded.into_io_error();
        assert!(BodyLimitExceeded::is_cause_of(&err));
        assert!(!BodyLimitExceeded::is_cause_of(&io::Error::other("disconnect")));
    }
}
