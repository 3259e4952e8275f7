// Public API - what other modules can use
pub use api::{image_data_uri, ApiClient, REQUEST_TIMEOUT};
pub use errors::ClientError;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore, StoredSession};

// Internal modules
mod api;
mod errors;
mod session;
