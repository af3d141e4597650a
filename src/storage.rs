//! Durable image storage.
//!
//! Images live in one flat directory and are referenced from the `ads` table by
//! filename only. The store never overwrites an existing file, and deletions that are
//! a side effect of another operation go through [`ImageStore::remove_best_effort`],
//! which logs and counts failures instead of propagating them. Uploads that are not yet
//! referenced by a committed row are held as a [`PendingImage`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::metrics::Metrics;

/// Extensions accepted for uploaded images (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Returns the lowercased extension of `file_name` if it is on the allow-list.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// A collision-resistant filename keeping the given extension.
pub fn generate_filename(ext: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), ext)
}

/// Accepts only flat, visible filenames (no separators, traversal, NUL or control characters).
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
        && !name.chars().any(|c| c.is_control())
}

#[derive(Clone)]
pub struct ImageStore {
    root: Arc<PathBuf>,
    metrics: Metrics,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, metrics: Metrics) -> Self {
        Self { root: Arc::new(root.into()), metrics }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(self.root.as_path()).await
    }

    fn resolve(&self, filename: &str) -> io::Result<PathBuf> {
        if !is_valid_filename(filename) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid image filename: {:?}", filename),
            ));
        }
        Ok(self.root.join(filename))
    }

    /// Writes a new image. Fails if a file with that name already exists.
    pub async fn save(&self, filename: &str, bytes: &[u8]) -> io::Result<()> {
        self.stage(filename, bytes).await?.commit();
        Ok(())
    }

    /// Writes a new image that is removed again unless [`PendingImage::commit`] is called.
    ///
    /// The guard is armed as soon as the file exists, so a caller that is cancelled
    /// mid-write or before its database write commits does not leave the file behind.
    pub async fn stage(&self, filename: &str, bytes: &[u8]) -> io::Result<PendingImage> {
        let path = self.resolve(filename)?;
        let mut file = tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await?;
        let pending = PendingImage { store: self.clone(), filename: filename.to_owned(), armed: true };
        if let Err(e) = write_all_synced(&mut file, bytes).await {
            drop(file);
            pending.discard("write failed").await;
            return Err(e);
        }
        self.metrics.inc_images_stored();
        tracing::debug!(filename, size = bytes.len(), "stored image");
        Ok(pending)
    }

    pub async fn exists(&self, filename: &str) -> bool {
        match self.resolve(filename) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn remove(&self, filename: &str) -> io::Result<()> {
        let path = self.resolve(filename)?;
        tokio::fs::remove_file(path).await?;
        self.metrics.inc_images_removed();
        Ok(())
    }

    /// Removes an image as a non-fatal side effect. Empty names are ignored.
    ///
    /// A failure leaves an orphaned file behind; it is reported as a `warn` event and
    /// through the `image_cleanup_failures` counter.
    pub async fn remove_best_effort(&self, filename: &str, reason: &str) {
        if filename.is_empty() {
            return;
        }
        if let Err(e) = self.remove(filename).await {
            self.metrics.inc_image_cleanup_failures();
            tracing::warn!(filename, reason, error = %e, "failed to remove image, file may be orphaned");
        }
    }
}

/// A stored image not yet referenced by a committed row.
///
/// Dropping an armed guard removes the file on a background task and counts it in
/// `uploads_abandoned`. This is the path taken when a request future is dropped, e.g.
/// on timeout or client disconnect.
#[must_use = "dropping a pending image removes the file"]
pub struct PendingImage {
    store: ImageStore,
    filename: String,
    armed: bool,
}

impl PendingImage {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Keeps the file. Call once the row referencing it is committed.
    pub fn commit(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.filename)
    }

    /// Removes the file now, as a best-effort cleanup after a failed write.
    pub async fn discard(mut self, reason: &str) {
        self.armed = false;
        self.store.remove_best_effort(&self.filename, reason).await;
    }
}

impl Drop for PendingImage {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let store = self.store.clone();
        let filename = std::mem::take(&mut self.filename);
        store.metrics.inc_uploads_abandoned();
        tracing::warn!(filename = %filename, "request ended before the image was committed, removing it");

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    store.remove_best_effort(&filename, "request abandoned").await;
                });
            }
            // No runtime left to run the async removal
            Err(_) => {
                let removed = store.resolve(&filename).and_then(std::fs::remove_file);
                match removed {
                    Ok(()) => store.metrics.inc_images_removed(),
                    Err(e) => {
                        store.metrics.inc_image_cleanup_failures();
                        tracing::warn!(filename = %filename, error = %e, "failed to remove image, file may be orphaned");
                    }
                }
            }
        }
    }
}

async fn write_all_synced(file: &mut tokio::fs::File, bytes: &[u8]) -> io::Result<()> {
    file.write_all(bytes).await?;
    file.sync_all().await
}
