use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower::ServiceExt; // for `oneshot`

use bookshelf::{
    book::InMemoryBookRepository,
    build_router,
    image::InMemoryImageStore,
    session::TokenConfig,
    user::{InMemoryUserRepository, PasswordHasher},
    AppState,
};

use super::assertions::ResponseAssertion;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

const TEST_SECRET: &str = "integration-secret";
const TEST_UPLOAD_LIMIT: usize = 1024 * 1024;

/// A registered account and the token it was issued
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

pub struct TestApp {
    pub state: AppState,
    pub images: Arc<InMemoryImageStore>,
    pub books: Arc<InMemoryBookRepository>,
    router: Router,
}

pub struct TestAppBuilder {
    token_ttl: Duration,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            token_ttl: Duration::days(7),
        }
    }

    #[allow(dead_code)]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn build(self) -> TestApp {
        let images = Arc::new(InMemoryImageStore::new());
        let books = Arc::new(InMemoryBookRepository::new());
        let state = AppState::new(
            Arc::new(InMemoryUserRepository::new()),
            books.clone(),
            images.clone(),
            TokenConfig::new(TEST_SECRET, self.token_ttl),
            PasswordHasher::new(1_000),
        );

        TestApp {
            router: build_router(state.clone(), TEST_UPLOAD_LIMIT),
            state,
            images,
            books,
        }
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> ResponseAssertion {
        let response = self.router.clone().oneshot(request).await.unwrap();
        ResponseAssertion::from_response(response).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> ResponseAssertion {
        self.send(json_request("POST", uri, token, body)).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: serde_json::Value) -> ResponseAssertion {
        self.send(json_request("PUT", uri, Some(token), body)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> ResponseAssertion {
        self.send(empty_request("GET", uri, token)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> ResponseAssertion {
        self.send(empty_request("DELETE", uri, Some(token))).await
    }

    /// Registers `username` with `<username>@x.com` / `secret1`
    pub async fn register(&self, username: &str) -> TestUser {
        let email = format!("{username}@x.com");
        let password = "secret1".to_string();

        let response = self
            .post_json(
                "/api/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                }),
            )
            .await
            .status(StatusCode::CREATED);

        TestUser {
            id: response.str_at("/user/id").to_string(),
            username: username.to_string(),
            email,
            password,
            token: response.str_at("/token").to_string(),
        }
    }

    /// Creates a book for `user` and returns its id
    pub async fn create_book(&self, user: &TestUser, title: &str, rating: u8) -> String {
        self.post_json(
            "/api/books",
            Some(&user.token),
            super::requests::book_payload(title, rating),
        )
        .await
        .status(StatusCode::CREATED)
        .str_at("/book/id")
        .to_string()
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Serves `app` on an ephemeral local port and returns its base URL
#[allow(dead_code)]
pub async fn spawn_server(app: &TestApp) -> (String, JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let address = listener.local_addr().unwrap();
    let router = app.router.clone();

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{address}"), handle)
}
