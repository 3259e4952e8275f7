use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The server answered with an error body; `message` is shown to the user as-is
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Session storage error: {0}")]
    Session(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}
