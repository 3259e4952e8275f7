use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::shared::AppState;
use crate::{book, session, user};

async fn health() -> Json<Value> {
    Json(json!({ "success": true, "status": "ok" }))
}

/// Builds the full HTTP surface.
///
/// Book mutations and the owner-scoped listing sit behind `jwt_auth`;
/// registration, login and the public feed do not.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    let auth = middleware::from_fn_with_state(state.clone(), session::jwt_auth);

    let auth_routes = Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login));

    let book_routes = Router::new()
        .route(
            "/",
            get(book::list_books).merge(post(book::create_book).route_layer(auth.clone())),
        )
        .route(
            "/user",
            get(book::list_user_books).route_layer(auth.clone()),
        )
        .route(
            "/:id",
            get(book::get_book).merge(
                put(book::update_book)
                    .delete(book::delete_book)
                    .route_layer(auth),
            ),
        );

    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes)
        .nest("/api/books", book_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
