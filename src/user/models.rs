use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::form_urlencoded;
use uuid::Uuid;

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

/// Database model for users table
#[derive(Debug, Clone, FromRow)]
pub struct UserModel {
    pub id: String, // UUID v4 as string
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_image: String,
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    /// Creates a new user with a generated ID.
    /// Falls back to the username-seeded avatar when no profile image is given.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: String,
        profile_image: Option<String>,
    ) -> Self {
        let username = username.into();
        let profile_image = profile_image.unwrap_or_else(|| default_avatar_url(&username));

        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email: email.into(),
            password_hash,
            profile_image,
            created_at: Utc::now(),
        }
    }
}

/// Public projection of a user; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_image: String,
}

impl From<&UserModel> for UserView {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
        }
    }
}

/// Deterministic avatar keyed by username
pub fn default_avatar_url(username: &str) -> String {
    let seed: String = form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("{AVATAR_BASE_URL}?seed={seed}")
}
