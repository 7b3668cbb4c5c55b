//! Filesystem storage for post images.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Errors that can occur while interacting with the upload storage backend.
#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed image storage rooted at a configured directory.
#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
}

impl UploadStorage {
    /// Initialise storage rooted at the provided directory, creating it if
    /// necessary.
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Persist an uploaded image and return its stored relative path.
    pub async fn store(
        &self,
        original_name: &str,
        payload: Bytes,
    ) -> Result<String, UploadStorageError> {
        if payload.is_empty() {
            return Err(UploadStorageError::EmptyPayload);
        }

        let stored_path = build_stored_path(original_name);
        let absolute = self.resolve(&stored_path)?;

        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        file.write_all(&payload).await?;
        file.flush().await?;

        Ok(stored_path)
    }

    /// Read a stored file back by its relative path.
    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        let contents = fs::read(absolute).await?;
        Ok(Bytes::from(contents))
    }

    /// Resolve a stored path under the root, rejecting traversal components.
    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        let safe = relative.components().all(|component| {
            matches!(component, Component::Normal(part) if !part.is_empty())
        });

        if !safe || relative.as_os_str().is_empty() {
            return Err(UploadStorageError::InvalidPath);
        }

        Ok(self.root.join(relative))
    }
}

/// Uuid-prefixed, slugified filename so uploads never collide and carry no
/// unsafe characters.
fn build_stored_path(original_name: &str) -> String {
    let path = Path::new(original_name);
    let stem = path
        .file_stem()
        .map(|stem| slugify(stem.to_string_lossy()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "upload".to_string());
    let extension = path
        .extension()
        .map(|ext| slugify(ext.to_string_lossy()))
        .filter(|ext| !ext.is_empty());

    match extension {
        Some(ext) => format!("{}-{stem}.{ext}", Uuid::new_v4()),
        None => format!("{}-{stem}", Uuid::new_v4()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_paths_are_slugified_and_unique() {
        let first = build_stored_path("Sunset at the Pier.JPG");
        let second = build_stored_path("Sunset at the Pier.JPG");

        assert!(first.ends_with("-sunset-at-the-pier.jpg"));
        assert_ne!(first, second);
    }

    #[test]
    fn traversal_components_are_rejected() {
        let storage = UploadStorage {
            root: PathBuf::from("/tmp/blogicum-test-uploads"),
        };

        assert!(matches!(
            storage.resolve("../etc/passwd"),
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(matches!(
            storage.resolve(""),
            Err(UploadStorageError::InvalidPath)
        ));
        assert!(storage.resolve("abc-image.png").is_ok());
    }
}
