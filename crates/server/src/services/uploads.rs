//! Image uploads stored on local disk and served under `/uploads`.

use std::path::{Path, PathBuf};

use tracing::instrument;

use super::ServiceError;

/// Public URL prefix for stored files.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const ALLOWED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

/// File store rooted at the configured upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a fresh UUID name keeping the original extension.
    ///
    /// Returns the public URL (`/uploads/<name>`).
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for empty files or unsupported
    /// extensions and `ServiceError::Io` if the write fails.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, ServiceError> {
        if bytes.is_empty() {
            return Err(ServiceError::invalid("파일이 비어있습니다."));
        }
        let extension = image_extension(original_name)
            .ok_or_else(|| ServiceError::invalid("이미지 파일만 업로드할 수 있습니다."))?;

        let name = format!("{}.{extension}", uuid::Uuid::new_v4());
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), bytes).await?;

        tracing::info!(file = %name, "Image stored");
        Ok(format!("{PUBLIC_PREFIX}{name}"))
    }

    /// Delete a file by its public URL.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Invalid` for URLs outside `/uploads/`,
    /// `ServiceError::NotFound` for a missing file and `ServiceError::Io`
    /// if the delete fails.
    pub async fn delete(&self, file_url: &str) -> Result<(), ServiceError> {
        let name = stored_name(file_url)
            .ok_or_else(|| ServiceError::invalid("잘못된 파일 경로입니다."))?;

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                tracing::info!(file = %name, "Image deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ServiceError::not_found("파일을 찾을 수 없습니다."))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Lowercased extension of an allowed image file name.
#[must_use]
pub fn image_extension(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// The bare file name of a public upload URL, rejecting path traversal.
#[must_use]
pub fn stored_name(file_url: &str) -> Option<&str> {
    let name = file_url.trim().strip_prefix(PUBLIC_PREFIX)?;
    let valid = !name.is_empty()
        && !name.contains(['/', '\\'])
        && !name.starts_with('.');
    valid.then_some(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("photo.JPG").as_deref(), Some("jpg"));
        assert_eq!(image_extension("a.b.webp").as_deref(), Some("webp"));
        assert_eq!(image_extension("script.sh"), None);
        assert_eq!(image_extension("noext"), None);
    }

    #[test]
    fn test_stored_name_rejects_traversal() {
        assert_eq!(stored_name("/uploads/abc.png"), Some("abc.png"));
        assert_eq!(stored_name("/uploads/../etc/passwd"), None);
        assert_eq!(stored_name("/uploads/..png"), None);
        assert_eq!(stored_name("/static/abc.png"), None);
        assert_eq!(stored_name("/uploads/"), None);
    }

    #[tokio::test]
    async fn test_save_then_delete() {
        let dir = std::env::temp_dir().join(format!("onandhome-uploads-{}", uuid::Uuid::new_v4()));
        let store = UploadStore::new(&dir);

        let url = store.save("fridge.png", b"\x89PNG").await.unwrap();
        assert!(url.starts_with(PUBLIC_PREFIX));
        assert!(url.ends_with(".png"));

        store.delete(&url).await.unwrap();
        assert!(matches!(
            store.delete(&url).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            store.save("notes.txt", b"hi").await,
            Err(ServiceError::Invalid(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
    }
}
