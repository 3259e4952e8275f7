// Public API - what other modules can use
pub use cloudinary::{CloudinaryConfig, CloudinaryImageStore, DEFAULT_API_BASE};
pub use memory::InMemoryImageStore;

// Internal modules
mod cloudinary;
mod memory;

use async_trait::async_trait;
use tracing::{instrument, warn};
use url::Url;

use crate::shared::AppError;

/// Raw image bytes on their way to the image store
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
            file_name,
        }
    }

    /// Rejects payloads that are empty or not declared as images
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bytes.is_empty() {
            return Err(AppError::Validation("Image must not be empty".to_string()));
        }
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Unsupported image type: {}",
                self.content_type
            )));
        }
        Ok(())
    }

    /// File extension derived from the declared content type
    pub fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "img",
        }
    }

    /// File name sent to the store, synthesised when the client gave none
    pub fn upload_name(&self) -> String {
        self.file_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("upload.{}", self.extension()))
    }
}

/// External collaborator that keeps image bytes and hands back durable URLs
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns its public URL
    async fn upload(&self, image: ImageUpload) -> Result<String, AppError>;

    /// Deletes the image behind a URL previously returned by `upload`
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

/// Deletes an image that is no longer referenced.
///
/// Failures are reported as warnings and swallowed; the returned `Result` is
/// the diagnostic outcome only and must not fail the calling operation.
#[instrument(skip(store))]
pub async fn discard_image(store: &dyn ImageStore, url: &str) -> Result<(), AppError> {
    let outcome = store.delete(url).await;
    if let Err(e) = &outcome {
        warn!(url, error = %e, "Best-effort image cleanup failed");
    }
    outcome
}

/// Derives the store identifier from an image URL.
///
/// Takes the path after the `upload` segment, drops a `v<digits>` version
/// segment and strips the file extension. URLs without an `upload` segment
/// fall back to the last path segment.
pub fn public_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    let mut tail: Vec<&str> = match segments.iter().position(|s| *s == "upload") {
        Some(index) => segments[index + 1..].to_vec(),
        None => segments.last().map(|s| vec![*s]).unwrap_or_default(),
    };

    if tail.len() > 1 && is_version_segment(tail[0]) {
        tail.remove(0);
    }

    let last = tail.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    if stem.is_empty() {
        return None;
    }
    tail.push(stem);

    Some(tail.join("/"))
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}
