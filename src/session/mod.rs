// Public API - what other modules can use
pub use middleware::jwt_auth;
pub use service::SessionService;
pub use token::TokenConfig;
pub use types::SessionClaims;

// Internal modules
mod middleware;
pub mod service;
mod token;
mod types;
