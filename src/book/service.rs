use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::{BookModel, BookOwner, BookView, Rating},
    pagination::{Page, PageRequest},
    repository::BookRepository,
    types::BookForm,
};
use crate::image::{discard_image, ImageStore};
use crate::shared::AppError;
use crate::user::{repository::UserRepository, UserView};

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide all required fields";
pub const NOT_FOUND_MESSAGE: &str = "Book not found";
pub const UPDATE_FORBIDDEN_MESSAGE: &str = "You are not authorized to update this book";
pub const DELETE_FORBIDDEN_MESSAGE: &str = "You are not authorized to delete this book";

/// Service for book listing and the owner-only mutations
pub struct BookService {
    books: Arc<dyn BookRepository + Send + Sync>,
    users: Arc<dyn UserRepository + Send + Sync>,
    images: Arc<dyn ImageStore>,
}

impl BookService {
    pub fn new(
        books: Arc<dyn BookRepository + Send + Sync>,
        users: Arc<dyn UserRepository + Send + Sync>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            books,
            users,
            images,
        }
    }

    /// Public feed, newest first
    #[instrument(skip(self))]
    pub async fn list_books(&self, request: PageRequest) -> Result<Page<BookView>, AppError> {
        self.list_page(None, request).await
    }

    /// Books owned by `owner`, newest first
    #[instrument(skip(self, owner), fields(user_id = %owner.id))]
    pub async fn list_user_books(
        &self,
        owner: &UserView,
        request: PageRequest,
    ) -> Result<Page<BookView>, AppError> {
        self.list_page(Some(&owner.id), request).await
    }

    async fn list_page(
        &self,
        owner_id: Option<&str>,
        request: PageRequest,
    ) -> Result<Page<BookView>, AppError> {
        let models = self
            .books
            .list_books(owner_id, request.skip(), request.limit)
            .await?;
        let total_items = self.books.count_books(owner_id).await?;
        let items = self.with_owners(&models).await?;

        debug!(
            page = request.page,
            returned = items.len(),
            total_items,
            "Listed books"
        );

        Ok(Page {
            items,
            current_page: request.page,
            total_items,
            total_pages: request.total_pages(total_items),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_book(&self, book_id: &str) -> Result<BookView, AppError> {
        let book = self.load(book_id).await?;
        let owner = self.owner_of(&book).await?;
        Ok(BookView::new(&book, owner))
    }

    /// Creates a book owned by `caller`; every field including the image is required
    #[instrument(skip(self, caller, form), fields(user_id = %caller.id))]
    pub async fn create_book(&self, caller: &UserView, form: BookForm) -> Result<BookView, AppError> {
        let (Some(title), Some(caption), Some(rating), Some(image)) = (
            present(form.title),
            present(form.caption),
            present(form.rating),
            form.image,
        ) else {
            return Err(AppError::Validation(MISSING_FIELDS_MESSAGE.to_string()));
        };

        let rating = Rating::parse(&rating)?;
        image.validate()?;

        let image_url = self.images.upload(image).await?;
        let book = BookModel::new(caller.id.clone(), title, caption, rating, image_url);

        if let Err(e) = self.books.create_book(&book).await {
            let _ = discard_image(self.images.as_ref(), &book.image).await;
            return Err(e);
        }

        info!(book_id = %book.id, "Book created");
        Ok(BookView::new(&book, Some(owner_from_view(caller))))
    }

    /// Applies the fields present in `form` to a book owned by `caller`.
    ///
    /// Every present field is validated before anything is written. A new
    /// image replaces the old one, which is discarded first.
    #[instrument(skip(self, caller, form), fields(user_id = %caller.id))]
    pub async fn update_book(
        &self,
        caller: &UserView,
        book_id: &str,
        form: BookForm,
    ) -> Result<BookView, AppError> {
        let mut book = self.load(book_id).await?;
        if !book.is_owned_by(&caller.id) {
            warn!(book_id, owner_id = %book.user_id, "Update refused for non-owner");
            return Err(AppError::Forbidden(UPDATE_FORBIDDEN_MESSAGE.to_string()));
        }

        let title = form.title.map(|t| required("Title", t)).transpose()?;
        let caption = form.caption.map(|c| required("Caption", c)).transpose()?;
        let rating = form.rating.as_deref().map(Rating::parse).transpose()?;
        if let Some(image) = &form.image {
            image.validate()?;
        }

        if let Some(title) = title {
            book.title = title;
        }
        if let Some(caption) = caption {
            book.caption = caption;
        }
        if let Some(rating) = rating {
            book.rating = rating.value();
        }
        let uploaded = match form.image {
            Some(image) => {
                let _ = discard_image(self.images.as_ref(), &book.image).await;
                book.image = self.images.upload(image).await?;
                true
            }
            None => false,
        };
        book.updated_at = Utc::now();

        if let Err(e) = self.books.update_book(&book).await {
            if uploaded {
                let _ = discard_image(self.images.as_ref(), &book.image).await;
            }
            return Err(e);
        }

        info!(book_id = %book.id, "Book updated");
        Ok(BookView::new(&book, Some(owner_from_view(caller))))
    }

    /// Removes a book owned by `caller` together with its cover image
    #[instrument(skip(self, caller), fields(user_id = %caller.id))]
    pub async fn delete_book(&self, caller: &UserView, book_id: &str) -> Result<(), AppError> {
        let book = self.load(book_id).await?;
        if !book.is_owned_by(&caller.id) {
            warn!(book_id, owner_id = %book.user_id, "Delete refused for non-owner");
            return Err(AppError::Forbidden(DELETE_FORBIDDEN_MESSAGE.to_string()));
        }

        let _ = discard_image(self.images.as_ref(), &book.image).await;
        self.books.delete_book(&book.id).await?;

        info!(book_id = %book.id, "Book deleted");
        Ok(())
    }

    async fn load(&self, book_id: &str) -> Result<BookModel, AppError> {
        self.books
            .get_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))
    }

    async fn owner_of(&self, book: &BookModel) -> Result<Option<BookOwner>, AppError> {
        Ok(self
            .users
            .get_user(&book.user_id)
            .await?
            .as_ref()
            .map(BookOwner::from))
    }

    /// Attaches owner projections, looking each owner up once
    async fn with_owners(&self, books: &[BookModel]) -> Result<Vec<BookView>, AppError> {
        let mut owners: HashMap<String, Option<BookOwner>> = HashMap::new();
        let mut views = Vec::with_capacity(books.len());

        for book in books {
            if !owners.contains_key(&book.user_id) {
                let owner = self.owner_of(book).await?;
                if owner.is_none() {
                    warn!(book_id = %book.id, user_id = %book.user_id, "Book owner no longer exists");
                }
                owners.insert(book.user_id.clone(), owner);
            }
            let owner = owners.get(&book.user_id).cloned().flatten();
            views.push(BookView::new(book, owner));
        }

        Ok(views)
    }
}

fn owner_from_view(user: &UserView) -> BookOwner {
    BookOwner {
        id: user.id.clone(),
        username: user.username.clone(),
        profile_image: user.profile_image.clone(),
    }
}

/// Trims a field and treats blank input as missing
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(field: &str, value: String) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}
