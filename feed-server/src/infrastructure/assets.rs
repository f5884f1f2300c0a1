use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::domain::error::DomainError;

const ALLOWED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpg", "image/jpeg"];

#[derive(Debug, Clone)]
pub(crate) struct ImageUpload {
    pub(crate) file_name: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Bytes,
}

/// Seam between the feed service and asset removal: the service only ever
/// schedules a removal, it never waits on one.
pub(crate) trait AssetCleanup: Send + Sync {
    fn schedule_remove(&self, path: &str);
}

/// Stores uploaded images under a configured root and removes superseded
/// files on a background worker. Removal is a single attempt; failure is
/// logged and dropped.
#[derive(Debug, Clone)]
pub(crate) struct ImageStore {
    root: PathBuf,
    cleanup_tx: UnboundedSender<String>,
}

impl ImageStore {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create images dir {}", root.display()))?;

        let (cleanup_tx, cleanup_rx) = mpsc::unbounded_channel();
        spawn_cleanup_worker(cleanup_rx);

        Ok(Self { root, cleanup_tx })
    }

    pub(crate) async fn store(&self, upload: ImageUpload) -> Result<String, DomainError> {
        if !ALLOWED_MIME_TYPES.contains(&upload.content_type.as_str()) {
            return Err(DomainError::violation(
                "image",
                "must be a png or jpeg image",
            ));
        }

        let name = format!(
            "{}_{:08x}_{}",
            Utc::now().timestamp_millis(),
            rand::random::<u32>(),
            sanitize_file_name(&upload.file_name),
        );
        let path = self.root.join(&name);

        tokio::fs::write(&path, &upload.bytes)
            .await
            .map_err(|err| DomainError::Internal(format!("failed to persist image: {err}")))?;

        debug!(path = %path.display(), "image asset stored");
        Ok(path.to_string_lossy().into_owned())
    }
}

impl AssetCleanup for ImageStore {
    fn schedule_remove(&self, path: &str) {
        if self.cleanup_tx.send(path.to_string()).is_err() {
            warn!(path, "asset cleanup worker is gone, removal dropped");
        }
    }
}

fn spawn_cleanup_worker(mut rx: UnboundedReceiver<String>) {
    tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(%path, "image asset removed"),
                Err(err) => warn!(%path, error = %err, "failed to remove image asset"),
            }
        }
    });
}

fn sanitize_file_name(raw: &str) -> String {
    // drop any directory components the client may have sent
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let mut name: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(64)
        .collect();

    if name.is_empty() {
        name.push_str("upload");
    }
    name
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use bytes::Bytes;

    use super::{AssetCleanup, ImageStore, ImageUpload, sanitize_file_name};
    use crate::domain::error::DomainError;

    fn temp_root(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "feed-images-{label}-{}-{:08x}",
            std::process::id(),
            rand::random::<u32>()
        ))
    }

    fn png_upload(file_name: &str) -> ImageUpload {
        ImageUpload {
            file_name: file_name.to_string(),
            content_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
        }
    }

    #[tokio::test]
    async fn store_persists_file_under_a_collision_resistant_name() {
        let store = ImageStore::new(temp_root("store")).expect("store must init");

        let first = store
            .store(png_upload("photo.png"))
            .await
            .expect("store must succeed");
        let second = store
            .store(png_upload("photo.png"))
            .await
            .expect("store must succeed");

        assert_ne!(first, second);
        assert!(first.ends_with("photo.png"));
        assert!(Path::new(&first).is_file());
        assert!(Path::new(&second).is_file());
    }

    #[tokio::test]
    async fn store_rejects_non_image_uploads() {
        let store = ImageStore::new(temp_root("mime")).expect("store must init");

        let upload = ImageUpload {
            file_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: Bytes::from_static(b"hello"),
        };

        let err = store.store(upload).await.expect_err("must be rejected");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn schedule_remove_deletes_the_file() {
        let store = ImageStore::new(temp_root("remove")).expect("store must init");
        let path = store
            .store(png_upload("photo.png"))
            .await
            .expect("store must succeed");
        assert!(Path::new(&path).is_file());

        store.schedule_remove(&path);

        for _ in 0..100 {
            if !Path::new(&path).exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("asset was not removed");
    }

    #[tokio::test]
    async fn schedule_remove_of_missing_file_is_silent() {
        let store = ImageStore::new(temp_root("missing")).expect("store must init");

        // single attempt, logged, nothing to observe but "no panic"
        store.schedule_remove("does/not/exist.png");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
