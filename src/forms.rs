//! Request-body plumbing shared by the JSON and multipart endpoints.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::header::CONTENT_TYPE,
    http::{request::Parts, HeaderMap},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::debug;

use crate::image::ImageUpload;
use crate::shared::AppError;

/// Name of the form field carrying the image in every endpoint
pub const IMAGE_FIELD: &str = "image";

pub fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

/// `Json` extractor whose rejections use the standard error body
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query` extractor whose rejections use the standard error body
#[derive(Debug)]
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Text fields and the optional image part of a multipart submission
#[derive(Debug, Default)]
pub struct FormFields {
    text: HashMap<String, String>,
    pub image: Option<ImageUpload>,
}

impl FormFields {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut fields = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;

                // An empty file part means the client picked no image
                if !bytes.is_empty() {
                    fields.image = Some(ImageUpload::new(bytes.to_vec(), content_type, file_name));
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                fields.text.insert(name, value);
            }
        }

        debug!(
            text_fields = fields.text.len(),
            has_image = fields.image.is_some(),
            "Read multipart form"
        );
        Ok(fields)
    }

    pub fn take(&mut self, name: &str) -> Option<String> {
        self.text.remove(name)
    }
}

/// Decodes a `data:<mime>;base64,<payload>` URI into an upload
pub fn decode_data_uri(value: &str) -> Result<ImageUpload, AppError> {
    let invalid = || AppError::Validation("Image must be a base64 data URI".to_string());

    let rest = value.strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    let content_type = meta.strip_suffix(";base64").ok_or_else(invalid)?;

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Image is not valid base64: {e}")))?;

    Ok(ImageUpload::new(bytes, content_type, None))
}
