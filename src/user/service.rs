use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{UserModel, UserView},
    password::PasswordHasher,
    repository::{UniqueField, UserRepository},
    types::{AuthResponse, LoginRequest, RegisterForm},
};
use crate::image::{discard_image, ImageStore};
use crate::session::TokenConfig;
use crate::shared::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;

/// Service for registration and login
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    image_store: Arc<dyn ImageStore>,
    token_config: TokenConfig,
    password_hasher: PasswordHasher,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        image_store: Arc<dyn ImageStore>,
        token_config: TokenConfig,
        password_hasher: PasswordHasher,
    ) -> Self {
        Self {
            repository,
            image_store,
            token_config,
            password_hasher,
        }
    }

    /// Registers a new user and signs them in.
    ///
    /// Checks run in a fixed order and the first failure wins: required
    /// fields, password length, username length, email syntax, email
    /// uniqueness, username uniqueness.
    #[instrument(skip(self, form))]
    pub async fn register(&self, form: RegisterForm) -> Result<AuthResponse, AppError> {
        let (Some(username), Some(email), Some(password)) = (
            present(form.username),
            present(form.email),
            form.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(validation("All fields are required"));
        };

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(validation("Password must be at least 6 characters long"));
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(validation("Username must be at least 3 characters long"));
        }
        if !is_valid_email(&email) {
            return Err(validation("Please provide a valid email address"));
        }
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(UniqueField::Email.conflict());
        }
        if self.repository.find_by_username(&username).await?.is_some() {
            return Err(UniqueField::Username.conflict());
        }

        let profile_image = match form.image {
            Some(image) => {
                image.validate()?;
                Some(self.image_store.upload(image).await?)
            }
            None => None,
        };

        let user = match self
            .insert_user(username, email, password, profile_image.clone())
            .await
        {
            Ok(user) => user,
            Err(e) => {
                if let Some(url) = &profile_image {
                    let _ = discard_image(self.image_store.as_ref(), url).await;
                }
                return Err(e);
            }
        };

        let token = self.token_config.issue(&user.id)?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            token,
            user: UserView::from(&user),
        })
    }

    /// A concurrent registration can still take the email or username before
    /// the insert; the repository reports that as a conflict
    async fn insert_user(
        &self,
        username: String,
        email: String,
        password: String,
        profile_image: Option<String>,
    ) -> Result<UserModel, AppError> {
        let password_hash = self.password_hasher.spawn_hash(password).await?;
        let user = UserModel::new(username, email, password_hash, profile_image);
        self.repository.create_user(&user).await?;
        Ok(user)
    }

    /// Checks credentials and issues a fresh token
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let (Some(email), Some(password)) = (
            present(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(validation("All fields are required"));
        };

        let user = self
            .repository
            .find_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!("Login attempted for unknown email");
                validation("User does not Exist")
            })?;

        let verified = self
            .password_hasher
            .spawn_verify(password, user.password_hash.clone())
            .await?;
        if !verified {
            warn!(user_id = %user.id, "Login attempted with wrong password");
            return Err(validation("Invalid Credentials"));
        }

        let token = self.token_config.issue(&user.id)?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResponse {
            success: true,
            message: "Login successful".to_string(),
            token,
            user: UserView::from(&user),
        })
    }
}

fn validation(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Trims a field and treats blank input as missing
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Minimal syntactic check: one `@`, non-empty local part, dotted domain, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
