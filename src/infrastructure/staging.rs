use crate::config::StartupError;
use std::path::Path;
use tracing::{info, warn};

/// Creates the staging directory and clears files left by a previous crash.
pub async fn prepare_staging_dir(dir: &Path) -> Result<(), StartupError> {
    let to_startup_error = |source| StartupError::StagingDir {
        path: dir.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(to_startup_error)?;

    let mut entries = tokio::fs::read_dir(dir).await.map_err(to_startup_error)?;
    let mut removed = 0usize;
    while let Some(entry) = entries.next_entry().await.map_err(to_startup_error)? {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => warn!("⚠️ Could not remove stale staged file {:?}: {}", entry.path(), e),
        }
    }

    if removed > 0 {
        info!("🧹 Removed {} stale staged file(s) from {:?}", removed, dir);
    }
    info!("📂 Staging directory: {:?}", dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_missing_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("uploads");
        prepare_staging_dir(&dir).await.unwrap();
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_clears_leftover_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("esp32cam_leftover.jpg"), b"stale").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();

        prepare_staging_dir(dir.path()).await.unwrap();

        assert!(!dir.path().join("esp32cam_leftover.jpg").exists());
        assert!(dir.path().join("keep").is_dir());
    }
}
