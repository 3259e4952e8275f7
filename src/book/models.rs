use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::shared::AppError;
use crate::user::models::UserModel;

pub const RATING_MESSAGE: &str = "Rating must be between 1 and 5";

/// Star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating(i32);

impl Rating {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(value: i32) -> Result<Self, AppError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::Validation(RATING_MESSAGE.to_string()))
        }
    }

    /// Parses a submitted form value; decimals and words are rejected
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        raw.trim()
            .parse::<i32>()
            .map_err(|_| AppError::Validation(RATING_MESSAGE.to_string()))
            .and_then(Self::new)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

/// Database model for books table
#[derive(Debug, Clone, FromRow)]
pub struct BookModel {
    pub id: String, // UUID v4 as string
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image: String, // URL in the image store
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookModel {
    /// Creates a new book owned by `user_id` with a generated ID
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        caption: impl Into<String>,
        rating: Rating,
        image: impl Into<String>,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            caption: caption.into(),
            rating: rating.value(),
            image: image.into(),
            user_id: user_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Owner projection attached to every listed book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookOwner {
    pub id: String,
    pub username: String,
    pub profile_image: String,
}

impl From<&UserModel> for BookOwner {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub rating: i32,
    pub image: String,
    pub user: Option<BookOwner>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookView {
    pub fn new(book: &BookModel, owner: Option<BookOwner>) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            caption: book.caption.clone(),
            rating: book.rating,
            image: book.image.clone(),
            user: owner,
            created_at: book.created_at,
            updated_at: book.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(1))]
    #[case(" 5 ", Some(5))]
    #[case("0", None)]
    #[case("6", None)]
    #[case("-3", None)]
    #[case("4.5", None)]
    #[case("five", None)]
    #[case("", None)]
    fn test_rating_parse(#[case] raw: &str, #[case] expected: Option<i32>) {
        assert_eq!(Rating::parse(raw).ok().map(Rating::value), expected);
    }

    #[test]
    fn test_new_book_and_ownership() {
        let book = BookModel::new("owner-1", "Dune", "Spice", Rating::new(5).unwrap(), "url");

        assert!(!book.id.is_empty());
        assert_eq!(book.created_at, book.updated_at);
        assert!(book.is_owned_by("owner-1"));
        assert!(!book.is_owned_by("owner-2"));
    }

    #[test]
    fn test_book_view_serializes_camel_case() {
        let book = BookModel::new("owner-1", "Dune", "Spice", Rating::new(4).unwrap(), "url");
        let owner = BookOwner {
            id: "owner-1".to_string(),
            username: "alice".to_string(),
            profile_image: "avatar".to_string(),
        };

        let json = serde_json::to_value(BookView::new(&book, Some(owner))).unwrap();
        assert_eq!(json["user"]["profileImage"], "avatar");
        assert_eq!(json["rating"], 4);
        assert!(json.get("createdAt").is_some());
        assert!(json["user"].get("email").is_none());
    }
}
