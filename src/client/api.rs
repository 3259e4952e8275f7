use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{ClientError, SessionStore, StoredSession};
use crate::book::{BookListResponse, BookMutationResponse, BookRequest, BookResponse, BookView};
use crate::image::ImageUpload;
use crate::shared::ErrorResponse;
use crate::user::{AuthResponse, LoginRequest, RegisterRequest, UserView};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Encodes an image the way the JSON endpoints expect it
pub fn image_data_uri(image: &ImageUpload) -> String {
    format!(
        "data:{};base64,{}",
        image.content_type,
        STANDARD.encode(&image.bytes)
    )
}

/// HTTP client for the book review API.
///
/// The bearer token for authenticated calls comes from the injected
/// `SessionStore`, which `register` and `login` fill and `logout` clears.
pub struct ApiClient {
    base_url: Url,
    http: Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path().trim_end_matches('/'));
            base_url.set_path(&path);
        }

        let http = Client::builder()
            .user_agent("bookshelf-client/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            http,
            session,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    /// `api/books/<id>` with the id escaped as a single path segment
    fn book_endpoint(&self, book_id: &str) -> Result<Url, ClientError> {
        let mut url = self.endpoint("api/books")?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(book_id);
        Ok(url)
    }

    async fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, ClientError> {
        let session = self
            .session
            .load()
            .await?
            .ok_or(ClientError::NotAuthenticated)?;
        Ok(self.http.request(method, url).bearer_auth(session.token))
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();
        let message = match serde_json::from_slice::<ErrorResponse>(&bytes) {
            Ok(body) => body.message,
            Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
        };

        warn!(status = status.as_u16(), message = %message, "Request failed");
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn remember(&self, auth: AuthResponse) -> Result<AuthResponse, ClientError> {
        self.session
            .store(&StoredSession {
                token: auth.token.clone(),
                user: auth.user.clone(),
            })
            .await?;
        debug!(user_id = %auth.user.id, "Session saved");
        Ok(auth)
    }

    #[instrument(skip(self, request))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint("api/auth/register")?)
            .json(request)
            .send()
            .await?;
        let auth = Self::handle_response::<AuthResponse>(response).await?;
        self.remember(auth).await
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let request = LoginRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let response = self
            .http
            .post(self.endpoint("api/auth/login")?)
            .json(&request)
            .send()
            .await?;
        let auth = Self::handle_response::<AuthResponse>(response).await?;
        self.remember(auth).await
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.clear().await
    }

    /// The cached profile of the signed-in user, if any
    pub async fn current_user(&self) -> Result<Option<UserView>, ClientError> {
        Ok(self.session.load().await?.map(|session| session.user))
    }

    #[instrument(skip(self))]
    pub async fn books(&self, page: u32, limit: u32) -> Result<BookListResponse, ClientError> {
        let mut url = self.endpoint("api/books")?;
        with_page(&mut url, page, limit);
        let response = self.http.get(url).send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self))]
    pub async fn user_books(&self, page: u32, limit: u32) -> Result<BookListResponse, ClientError> {
        let mut url = self.endpoint("api/books/user")?;
        with_page(&mut url, page, limit);
        let response = self.authorized(Method::GET, url).await?.send().await?;
        Self::handle_response(response).await
    }

    #[instrument(skip(self))]
    pub async fn book(&self, book_id: &str) -> Result<BookView, ClientError> {
        let url = self.book_endpoint(book_id)?;
        let response = self.http.get(url).send().await?;
        Ok(Self::handle_response::<BookResponse>(response).await?.book)
    }

    #[instrument(skip(self, book))]
    pub async fn create_book(&self, book: &BookRequest) -> Result<BookView, ClientError> {
        let url = self.endpoint("api/books")?;
        let response = self
            .authorized(Method::POST, url)
            .await?
            .json(book)
            .send()
            .await?;
        returned_book(Self::handle_response(response).await?)
    }

    /// Sends only the fields set in `changes`
    #[instrument(skip(self, changes))]
    pub async fn update_book(
        &self,
        book_id: &str,
        changes: &BookRequest,
    ) -> Result<BookView, ClientError> {
        let url = self.book_endpoint(book_id)?;
        let response = self
            .authorized(Method::PUT, url)
            .await?
            .json(changes)
            .send()
            .await?;
        returned_book(Self::handle_response(response).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_book(&self, book_id: &str) -> Result<String, ClientError> {
        let url = self.book_endpoint(book_id)?;
        let response = self.authorized(Method::DELETE, url).await?.send().await?;
        let body: BookMutationResponse = Self::handle_response(response).await?;
        Ok(body.message)
    }
}

fn with_page(url: &mut Url, page: u32, limit: u32) {
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("limit", &limit.to_string());
}

fn returned_book(body: BookMutationResponse) -> Result<BookView, ClientError> {
    body.book
        .ok_or_else(|| ClientError::UnexpectedResponse("response did not include the book".to_string()))
}
