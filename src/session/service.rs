use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::token::TokenConfig;
use crate::shared::AppError;
use crate::user::{models::UserView, repository::UserRepository};

pub const MISSING_TOKEN_MESSAGE: &str = "No token provided, authorization denied";
pub const UNKNOWN_USER_MESSAGE: &str = "User not found, authorization denied";

/// Resolves bearer tokens to the users they were issued for
pub struct SessionService {
    token_config: TokenConfig,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl SessionService {
    pub fn new(
        token_config: TokenConfig,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            token_config,
            user_repository,
        }
    }

    /// Authenticates the raw `Authorization` header value.
    ///
    /// Fails with `Unauthorized` when the header is missing or lacks the
    /// `Bearer ` scheme, when the token does not verify, or when the user it
    /// names no longer exists.
    #[instrument(skip(self, authorization))]
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<UserView, AppError> {
        let token = authorization
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| {
                warn!("Missing or malformed Authorization header");
                AppError::Unauthorized(MISSING_TOKEN_MESSAGE.to_string())
            })?;

        let claims = self.token_config.verify(token.trim())?;

        let user = self
            .user_repository
            .get_user(&claims.user_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "User lookup failed during authentication");
                AppError::Unauthorized(UNKNOWN_USER_MESSAGE.to_string())
            })?
            .ok_or_else(|| {
                warn!(user_id = %claims.user_id, "Token refers to a user that does not exist");
                AppError::Unauthorized(UNKNOWN_USER_MESSAGE.to_string())
            })?;

        info!(user_id = %user.id, username = %user.username, "Session authenticated");
        Ok(UserView::from(&user))
    }
}
