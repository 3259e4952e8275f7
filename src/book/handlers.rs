use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    pagination::{Page, PageRequest, FEED_PAGE_LIMIT, USER_PAGE_LIMIT},
    service::BookService,
    types::{BookForm, BookListResponse, BookMutationResponse, BookResponse, ListQuery},
    BookView,
};
use crate::forms::QueryParams;
use crate::shared::{AppError, AppState};
use crate::user::UserView;

fn book_service(state: &AppState) -> BookService {
    BookService::new(
        Arc::clone(&state.book_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.image_store),
    )
}

fn list_response(page: Page<BookView>) -> BookListResponse {
    BookListResponse {
        success: true,
        books: page.items,
        current_page: page.current_page,
        total_books: page.total_items,
        total_pages: page.total_pages,
    }
}

/// HTTP handler for the public feed
///
/// GET /api/books?page&limit
#[instrument(name = "list_books", skip(state))]
pub async fn list_books(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<BookListResponse>, AppError> {
    let request = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        FEED_PAGE_LIMIT,
    )?;

    let page = book_service(&state).list_books(request).await?;

    info!(
        page = page.current_page,
        book_count = page.items.len(),
        "Books listed successfully"
    );
    Ok(Json(list_response(page)))
}

/// HTTP handler for the signed-in user's own books
///
/// GET /api/books/user?page&limit
#[instrument(name = "list_user_books", skip(state, user), fields(user_id = %user.id))]
pub async fn list_user_books(
    State(state): State<AppState>,
    Extension(user): Extension<UserView>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<BookListResponse>, AppError> {
    let request = PageRequest::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        USER_PAGE_LIMIT,
    )?;

    let page = book_service(&state).list_user_books(&user, request).await?;

    Ok(Json(list_response(page)))
}

/// GET /api/books/:id
#[instrument(name = "get_book", skip(state))]
pub async fn get_book(
    State(state): State<AppState>,
    Path(book_id): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = book_service(&state).get_book(&book_id).await?;

    Ok(Json(BookResponse {
        success: true,
        book,
    }))
}

/// HTTP handler for creating a book
///
/// POST /api/books
/// Accepts multipart (`title`, `caption`, `rating`, `image`) or JSON with a data URI image
#[instrument(name = "create_book", skip(state, user, form), fields(user_id = %user.id))]
pub async fn create_book(
    State(state): State<AppState>,
    Extension(user): Extension<UserView>,
    form: BookForm,
) -> Result<(StatusCode, Json<BookMutationResponse>), AppError> {
    info!("Creating new book");

    let book = book_service(&state).create_book(&user, form).await?;

    info!(book_id = %book.id, "Book created successfully");
    Ok((
        StatusCode::CREATED,
        Json(BookMutationResponse {
            success: true,
            message: "Book created successfully".to_string(),
            book: Some(book),
        }),
    ))
}

/// HTTP handler for partially updating a book
///
/// PUT /api/books/:id
#[instrument(name = "update_book", skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_book(
    State(state): State<AppState>,
    Extension(user): Extension<UserView>,
    Path(book_id): Path<String>,
    form: BookForm,
) -> Result<Json<BookMutationResponse>, AppError> {
    let book = book_service(&state)
        .update_book(&user, &book_id, form)
        .await?;

    Ok(Json(BookMutationResponse {
        success: true,
        message: "Book updated successfully".to_string(),
        book: Some(book),
    }))
}

/// DELETE /api/books/:id
#[instrument(name = "delete_book", skip(state, user), fields(user_id = %user.id))]
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(user): Extension<UserView>,
    Path(book_id): Path<String>,
) -> Result<Json<BookMutationResponse>, AppError> {
    book_service(&state).delete_book(&user, &book_id).await?;

    info!(book_id = %book_id, "Book deleted successfully");
    Ok(Json(BookMutationResponse {
        success: true,
        message: "Book deleted successfully".to_string(),
        book: None,
    }))
}
