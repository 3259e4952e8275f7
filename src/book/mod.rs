// Public API - what other modules can use
pub use handlers::{create_book, delete_book, get_book, list_books, list_user_books, update_book};
pub use models::{BookModel, BookOwner, BookView, Rating};
pub use pagination::{Page, PageRequest};
pub use repository::{BookRepository, InMemoryBookRepository, PostgresBookRepository};
pub use service::BookService;
pub use types::{
    BookForm, BookListResponse, BookMutationResponse, BookRequest, BookResponse, RatingInput,
};

// Internal modules
mod handlers;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod service;
pub mod types;
