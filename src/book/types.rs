use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    Json,
};
use serde::{Deserialize, Serialize};

use super::models::BookView;
use crate::forms::{decode_data_uri, is_multipart, FormFields};
use crate::image::ImageUpload;
use crate::shared::AppError;

/// Raw `page`/`limit` query values, validated by `PageRequest::from_query`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookListResponse {
    pub success: bool,
    pub books: Vec<BookView>,
    pub current_page: u32,
    pub total_books: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookResponse {
    pub success: bool,
    pub book: BookView,
}

/// Response for create, update and delete
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookMutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book: Option<BookView>,
}

/// Rating as sent in JSON: either a number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RatingInput {
    Number(serde_json::Number),
    Text(String),
}

impl RatingInput {
    fn into_raw(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// JSON body for creating or updating a book
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingInput>,
    /// Cover image as a base64 data URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Book input normalised from either a JSON or a multipart body.
///
/// `None` means the field was not sent at all; creation requires every
/// field while updates only touch the ones that are present.
#[derive(Debug, Default)]
pub struct BookForm {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub rating: Option<String>,
    pub image: Option<ImageUpload>,
}

#[async_trait]
impl<S> FromRequest<S> for BookForm
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
                title: fields.take("title"),
                caption: fields.take("caption"),
                rating: fields.take("rating"),
                image: fields.image,
            });
        }

        let Json(body) = Json::<BookRequest>::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        let image = match body.image.as_deref().filter(|value| !value.is_empty()) {
            Some(value) => Some(decode_data_uri(value)?),
            None => None,
        };

        Ok(Self {
            title: body.title,
            caption: body.caption,
            rating: body.rating.map(RatingInput::into_raw),
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_accepts_number_or_string() {
        let body: BookRequest = serde_json::from_str(r#"{"rating": 4}"#).unwrap();
        assert_eq!(body.rating.map(RatingInput::into_raw).as_deref(), Some("4"));

        let body: BookRequest = serde_json::from_str(r#"{"rating": "3"}"#).unwrap();
        assert_eq!(body.rating.map(RatingInput::into_raw).as_deref(), Some("3"));

        let body: BookRequest = serde_json::from_str(r#"{"rating": 4.5}"#).unwrap();
        assert_eq!(body.rating.map(RatingInput::into_raw).as_deref(), Some("4.5"));
    }

    #[test]
    fn test_mutation_response_omits_missing_book() {
        let response = BookMutationResponse {
            success: true,
            message: "Book deleted successfully".to_string(),
            book: None,
        };
        let json = serde_json::to_value(response).unwrap();
        assert!(json.get("book").is_none());
    }

    #[test]
    fn test_list_response_is_camel_case() {
        let response = BookListResponse {
            success: true,
            books: vec![],
            current_page: 3,
            total_books: 7,
            total_pages: 2,
        };
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["currentPage"], 3);
        assert_eq!(json["totalBooks"], 7);
        assert_eq!(json["totalPages"], 2);
    }
}
