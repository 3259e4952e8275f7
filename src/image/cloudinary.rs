use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::{public_id_from_url, ImageStore, ImageUpload};
use crate::shared::AppError;

pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Credentials and endpoint settings for the Cloudinary upload API
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: Option<String>,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Image store backed by Cloudinary's signed upload API
pub struct CloudinaryImageStore {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryImageStore {
    pub fn new(config: CloudinaryConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ImageStore(format!("failed to configure HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{action}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// SHA-256 over the alphabetically sorted `key=value` pairs followed by the secret
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        hex::encode(Sha256::digest(format!("{joined}{}", self.config.api_secret)))
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();

        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(body) => format!("image host returned {status}: {}", body.error.message),
            Err(_) => format!(
                "image host returned {status}: {}",
                String::from_utf8_lossy(&bytes)
            ),
        }
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    warn!(error = %e, "Image host request failed");
    AppError::ImageStore(e.to_string())
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    #[instrument(skip(self, image), fields(size = image.bytes.len()))]
    async fn upload(&self, image: ImageUpload) -> Result<String, AppError> {
        let timestamp = Utc::now().timestamp().to_string();

        let mut params = vec![("timestamp", timestamp.clone())];
        if let Some(folder) = &self.config.folder {
            params.push(("folder", folder.clone()));
        }
        let signature = self.sign(&params);

        let file_name = image.upload_name();
        let part = Part::bytes(image.bytes)
            .file_name(file_name)
            .mime_str(&image.content_type)
            .map_err(|e| AppError::Validation(format!("Invalid image content type: {e}")))?;

        let mut form = Form::new()
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part("file", part);
        if let Some(folder) = &self.config.folder {
            form = form.text("folder", folder.clone());
        }

        debug!("Uploading image to Cloudinary");
        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let message = Self::error_message(response).await;
            warn!(message = %message, "Image upload rejected");
            return Err(AppError::ImageStore(message));
        }

        let body: UploadResponse = response.json().await.map_err(request_error)?;

        info!(url = %body.secure_url, "Image uploaded");
        Ok(body.secure_url)
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let public_id = public_id_from_url(url)
            .ok_or_else(|| AppError::ImageStore(format!("Cannot derive image id from {url}")))?;
        let timestamp = Utc::now().timestamp().to_string();

        let params = vec![("public_id", public_id.clone()), ("timestamp", timestamp)];
        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params;
        form.push(("api_key", self.config.api_key.clone()));
        form.push(("signature", signature));
        form.push(("signature_algorithm", "sha256".to_string()));

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(AppError::ImageStore(Self::error_message(response).await));
        }

        let body: DestroyResponse = response.json().await.map_err(request_error)?;
        if body.result != "ok" {
            warn!(public_id = %public_id, result = %body.result, "Image host did not delete image");
            return Err(AppError::ImageStore(format!(
                "image host could not delete {public_id}: {}",
                body.result
            )));
        }

        info!(public_id = %public_id, "Image deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> CloudinaryImageStore {
        CloudinaryImageStore::new(CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "key-123".to_string(),
            api_secret: "shh".to_string(),
            folder: Some("books".to_string()),
            api_base: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_signature_is_order_independent_and_secret_dependent() {
        let server = MockServer::start().await;
        let store = store(&server);

        let a = store.sign(&[("timestamp", "1".to_string()), ("folder", "books".to_string())]);
        let b = store.sign(&[("folder", "books".to_string()), ("timestamp", "1".to_string())]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let expected = hex::encode(Sha256::digest("folder=books&timestamp=1shh"));
        assert_eq!(a, expected);
    }

    #[tokio::test]
    async fn test_upload_returns_secure_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .and(body_string_contains("key-123"))
            .and(body_string_contains("name=\"signature\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "public_id": "books/abc",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/books/abc.png"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let url = store(&server)
            .upload(ImageUpload::new(vec![1, 2, 3], "image/png", None))
            .await
            .unwrap();

        assert_eq!(
            url,
            "https://res.cloudinary.com/demo/image/upload/v1/books/abc.png"
        );
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_host_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/upload"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Invalid Signature" }
            })))
            .mount(&server)
            .await;

        let result = store(&server)
            .upload(ImageUpload::new(vec![1], "image/png", None))
            .await;

        match result {
            Err(AppError::ImageStore(message)) => assert!(message.contains("Invalid Signature")),
            other => panic!("expected image store error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_sends_derived_public_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/destroy"))
            .and(body_string_contains("public_id=books%2Fabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "ok"
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .delete("https://res.cloudinary.com/demo/image/upload/v1/books/abc.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_not_found_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/demo/image/destroy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "not found"
            })))
            .mount(&server)
            .await;

        let result = store(&server)
            .delete("https://res.cloudinary.com/demo/image/upload/books/gone.png")
            .await;
        assert!(matches!(result, Err(AppError::ImageStore(_))));
    }
}
