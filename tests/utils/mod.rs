pub mod assertions;
pub mod requests;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use assertions::ResponseAssertion;
#[allow(unused_imports)]
pub use requests::{book_payload, multipart_book};
#[allow(unused_imports)]
pub use setup::{spawn_server, TestApp, TestAppBuilder, TestUser};
