use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::Result;

/// Delete the file or directory an operation was derived from.
///
/// Missing paths are ignored. The entry type is read from the file system,
/// never guessed from the extension.
pub async fn delete_source<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let metadata = match fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Source already gone, nothing to delete: {}", path.display());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    info!("Deleting input file/dir: {}", path.display());
    if metadata.is_dir() {
        fs::remove_dir_all(path).await?;
    } else {
        fs::remove_file(path).await?;
    }
    Ok(())
}

/// Remove a file if it exists, ignoring any failure
pub async fn remove_if_exists<P: AsRef<Path>>(path: P) {
    let path = path.as_ref();
    match fs::remove_file(path).await {
        Ok(()) => debug!("Removed {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove {}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_path_is_noop() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist.mp4");
        assert!(delete_source(&missing).await.is_ok());
    }

    #[tokio::test]
    async fn test_deletes_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, b"data").unwrap();

        delete_source(&file).await.unwrap();
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_deletes_directory_with_extension_like_name() {
        let dir = TempDir::new().unwrap();
        let frames = dir.path().join("frames.png");
        std::fs::create_dir_all(frames.join("nested")).unwrap();
        std::fs::write(frames.join("00000001.png"), b"png").unwrap();

        delete_source(&frames).await.unwrap();
        assert!(!frames.exists());
    }

    #[tokio::test]
    async fn test_remove_if_exists_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        remove_if_exists(dir.path().join("nope.tmp")).await;

        let file = dir.path().join("partial.m4a");
        std::fs::write(&file, b"x").unwrap();
        remove_if_exists(&file).await;
        assert!(!file.exists());
    }
}
