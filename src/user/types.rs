use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    Json,
};
use serde::{Deserialize, Serialize};

use super::models::UserView;
use crate::forms::{decode_data_uri, is_multipart, FormFields};
use crate::image::ImageUpload;
use crate::shared::AppError;

/// JSON body for registration; every field is optional so that missing
/// fields surface as validation messages instead of extractor rejections
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Optional profile picture as a base64 data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Response for successful registration and login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserView,
}

/// Registration input normalised from either a JSON or a multipart body
#[derive(Debug, Default)]
pub struct RegisterForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<ImageUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for RegisterForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(req.headers()) {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            let mut fields = FormFields::read(multipart).await?;

            return Ok(Self {
                username: fields.take("username"),
                email: fields.take("email"),
                password: fields.take("password"),
                image: fields.image,
            });
        }

        let Json(body) = Json::<RegisterRequest>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let image = match body.image.as_deref().filter(|value| !value.is_empty()) {
            Some(value) => Some(decode_data_uri(value)?),
            None => None,
        };

        Ok(Self {
            username: body.username,
            email: body.email,
            password: body.password,
            image,
        })
    }
}
