// Library crate for the bookshelf review service
// This file exposes the public API for the binary and integration tests

pub mod app;
pub mod book;
pub mod client;
pub mod config;
pub mod forms;
pub mod image;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use config::{AppConfig, ConfigError};
pub use shared::{AppError, AppState, ErrorResponse};
