// Public API - what other modules can use
pub use handlers::{login, register};
pub use models::{UserModel, UserView};
pub use password::PasswordHasher;
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UniqueField, UserRepository};
pub use service::UserService;
pub use types::{AuthResponse, LoginRequest, RegisterForm, RegisterRequest};

// Internal modules
mod handlers;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod types;
