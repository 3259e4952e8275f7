use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::UserModel;
use crate::shared::AppError;

/// Column with a uniqueness constraint a new user can clash with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl UniqueField {
    pub fn message(self) -> &'static str {
        match self {
            UniqueField::Email => "Email is already registered",
            UniqueField::Username => "Username is already taken",
        }
    }

    pub fn conflict(self) -> AppError {
        AppError::Conflict(self.message().to_string())
    }

    /// Maps a Postgres unique constraint name onto the clashing column
    fn from_constraint(constraint: &str) -> Option<Self> {
        if constraint.contains("email") {
            Some(UniqueField::Email)
        } else if constraint.contains("username") {
            Some(UniqueField::Username)
        } else {
            None
        }
    }
}

/// Trait for user credential storage
#[async_trait]
pub trait UserRepository {
    /// Inserts a user; a taken email or username fails with `AppError::Conflict`
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, UserModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Creating user in memory");

        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            warn!(user_id = %user.id, "Email already registered");
            return Err(UniqueField::Email.conflict());
        }
        if users.values().any(|existing| existing.username == user.username) {
            warn!(user_id = %user.id, "Username already taken");
            return Err(UniqueField::Username.conflict());
        }
        if users.contains_key(&user.id) {
            return Err(AppError::DatabaseError(format!("User id {} already exists", user.id)));
        }
        users.insert(user.id.clone(), user.clone());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.email == email).cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.read().await;
        Ok(users.values().find(|user| user.username == username).cloned())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<UserModel>, AppError> {
        let sql = format!(
            "SELECT id, username, email, password_hash, profile_image, created_at FROM users WHERE {column} = $1"
        );

        sqlx::query_as::<_, UserModel>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, column, "Failed to fetch user from database");
                AppError::DatabaseError(e.to_string())
            })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, username = %user.username, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, profile_image, created_at) VALUES ($1, $2, $3, $4, $5, $6)"
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_image)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_error) = &e {
                let clash = db_error
                    .is_unique_violation()
                    .then(|| db_error.constraint().and_then(UniqueField::from_constraint))
                    .flatten();
                if let Some(field) = clash {
                    warn!(?field, "User violates a uniqueness constraint");
                    return field.conflict();
                }
            }
            warn!(error = %e, "Failed to create user in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(user_id = %user.id, "User created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_by("id", user_id).await
    }

    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_by("email", email).await
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_by("username", username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn user(username: &str, email: &str) -> UserModel {
        UserModel::new(username, email, "hash".to_string(), None)
    }

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let repo = InMemoryUserRepository::new();
        let alice = user("alice", "a@x.com");
        repo.create_user(&alice).await.unwrap();

        let by_id = repo.get_user(&alice.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");

        let by_email = repo.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, alice.id);

        let by_name = repo.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, alice.id);

        assert!(repo.get_user("missing").await.unwrap().is_none());
        assert!(repo.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uniqueness_is_enforced() {
        let repo = InMemoryUserRepository::new();
        repo.create_user(&user("alice", "a@x.com")).await.unwrap();

        let same_email = repo.create_user(&user("alice2", "a@x.com")).await;
        assert!(matches!(same_email, Err(AppError::Conflict(m)) if m == "Email is already registered"));

        let same_name = repo.create_user(&user("alice", "other@x.com")).await;
        assert!(matches!(same_name, Err(AppError::Conflict(m)) if m == "Username is already taken"));

        // Email wins when both clash
        let both = repo.create_user(&user("alice", "a@x.com")).await;
        assert!(matches!(both, Err(AppError::Conflict(m)) if m == "Email is already registered"));

        assert_eq!(repo.user_count().await, 1);
    }

    #[rstest]
    #[case("users_email_key", Some(UniqueField::Email))]
    #[case("users_username_key", Some(UniqueField::Username))]
    #[case("users_pkey", None)]
    fn test_unique_field_from_constraint(#[case] constraint: &str, #[case] expected: Option<UniqueField>) {
        assert_eq!(UniqueField::from_constraint(constraint), expected);
    }
}
