use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    service::UserService,
    types::{AuthResponse, LoginRequest, RegisterForm},
};
use crate::forms::JsonBody;
use crate::shared::{AppError, AppState};

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.image_store),
        state.token_config.clone(),
        state.password_hasher.clone(),
    )
}

/// HTTP handler for registering a new account
///
/// POST /api/auth/register
/// Accepts JSON or multipart (with an optional `image` part); returns 201 with a token
#[instrument(name = "register", skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    form: RegisterForm,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    info!("Registering new user");

    let response = user_service(&state).register(form).await?;

    info!(user_id = %response.user.id, "Registration completed");
    Ok((StatusCode::CREATED, Json(response)))
}

/// HTTP handler for signing in
///
/// POST /api/auth/login
#[instrument(name = "login", skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    info!("Logging in user");

    let response = user_service(&state).login(request).await?;

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .with_state(AppStateBuilder::new().build())
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_register_handler_returns_created() {
        let response = app()
            .oneshot(json_request(
                "/api/auth/register",
                serde_json::json!({"username": "alice", "email": "a@x.com", "password": "secret1"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["success"], true);
        assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(json["user"]["username"], "alice");
        assert!(json["user"].get("password").is_none());
        assert!(json["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_register_handler_multipart() {
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        for (name, value) in [
            ("username", "bobby"),
            ("email", "b@x.com"),
            ("password", "secret1"),
        ] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"me.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&[0x89, 0x50, 0x4e, 0x47]);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = json_body(response).await;
        let profile_image = json["user"]["profileImage"].as_str().unwrap();
        assert!(profile_image.starts_with("https://images.local/upload/"));
    }

    #[tokio::test]
    async fn test_register_handler_missing_fields() {
        let response = app()
            .oneshot(json_request(
                "/api/auth/register",
                serde_json::json!({"username": "alice"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "All fields are required");
    }

    #[tokio::test]
    async fn test_login_handler_unknown_user() {
        let response = app()
            .oneshot(json_request(
                "/api/auth/login",
                serde_json::json!({"email": "nobody@x.com", "password": "x"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["message"], "User does not Exist");
    }

    #[tokio::test]
    async fn test_login_handler_malformed_json_is_structured() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"email": "a@x.com""#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["success"], false);
    }
}
