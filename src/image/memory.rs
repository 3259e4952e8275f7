use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{public_id_from_url, ImageStore, ImageUpload};
use crate::shared::AppError;

const BASE_URL: &str = "https://images.local/upload";

/// In-memory image store for development and testing
pub struct InMemoryImageStore {
    images: RwLock<HashMap<String, ImageUpload>>,
    fail_deletes: AtomicBool,
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self {
            images: RwLock::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent delete fail, to exercise best-effort cleanup
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub async fn image_count(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn contains(&self, url: &str) -> bool {
        match public_id_from_url(url) {
            Some(id) => self.images.read().await.contains_key(&id),
            None => false,
        }
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    #[instrument(skip(self, image), fields(size = image.bytes.len()))]
    async fn upload(&self, image: ImageUpload) -> Result<String, AppError> {
        let public_id = Uuid::new_v4().simple().to_string();
        let url = format!("{BASE_URL}/{public_id}.{}", image.extension());

        self.images.write().await.insert(public_id, image);

        debug!(url = %url, "Stored image in memory");
        Ok(url)
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::ImageStore("Image deletion unavailable".to_string()));
        }

        let public_id = public_id_from_url(url)
            .ok_or_else(|| AppError::ImageStore(format!("Cannot derive image id from {url}")))?;

        if self.images.write().await.remove(&public_id).is_none() {
            warn!(public_id = %public_id, "Image not found in memory");
            return Err(AppError::ImageStore("Image not found".to_string()));
        }

        debug!(public_id = %public_id, "Deleted image from memory");
        Ok(())
    }
}
