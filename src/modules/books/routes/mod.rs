//! HTTP handlers for `/api/books`.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, JsonRejection, PathRejection, QueryRejection},
        FromRequest, Path, Query, Request, State,
    },
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde::de::DeserializeOwned;
use shelf_http::error::AppError;

use super::models::{Book, BookDetails, BookListing, BulkOutcome, ListQuery, NewBook, UpdateBook};
use super::service::{BookError, BookService};
use crate::utils;


/// Shared state of the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub service: Arc<BookService>,
    pub default_page_size: i64,
    /// Source of "now" for popularity scores
    pub current_year: fn() -> i32,
}

impl BooksState {
    pub fn new(service: Arc<BookService>, default_page_size: i64) -> Self {
        Self {
            service,
            default_page_size,
            current_year: system_year,
        }
    }
}

fn system_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_books).delete(delete_books))
        .route("/{id}", put(update_book).get(get_book))
        .with_state(state)
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::MismatchedId { .. } => AppError::id_mismatch(err.to_string()),
            BookError::Duplicate { .. } => AppError::bad_request(err.to_string()),
            BookError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

fn not_found(id: i64) -> AppError {
    AppError::not_found(format!("Book with ID {id} not found."))
}

/// Items of a bulk request. An empty body, JSON `null` and `[]` all count as
/// no items; any other body must be a JSON array sent as `application/json`.
async fn bulk_items<T: DeserializeOwned>(
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
    empty_message: &str,
) -> Result<Vec<T>, AppError> {
    let body = body.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::empty_input(empty_message));
    }

    let mut request = Request::new(Body::from(body));
    *request.headers_mut() = headers;
    match Json::<Option<Vec<T>>>::from_request(request, &()).await? {
        Json(Some(items)) if !items.is_empty() => Ok(items),
        _ => Err(AppError::empty_input(empty_message)),
    }
}

/// `GET /`: one page of active books, most viewed first.
async fn list_books(
    State(state): State<BooksState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<BookListing>, AppError> {
    let Query(query) = query?;
    let page_number = query.page_number.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(state.default_page_size);

    let mut books = state.service.list_all().await?;
    books.sort_by(|a, b| b.views.cmp(&a.views));

    let window = utils::page_window(books.len(), page_number, page_size);
    let page: Vec<Book> = books.drain(window).collect();

    tracing::debug!(
        page_number,
        page_size,
        returned = page.len(),
        titles_only = query.titles_only,
        "books listed"
    );

    let listing = if query.titles_only {
        BookListing::Titles(page.into_iter().map(|b| b.title).collect())
    } else {
        BookListing::Books(page)
    };
    Ok(Json(listing))
}

/// `GET /{id}`: counts the view, then reports the record with its score.
///
/// The increment is read-modify-write, so concurrent fetches of one book
/// can lose views.
async fn get_book(
    State(state): State<BooksState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<BookDetails>, AppError> {
    let Path(id) = id?;
    let mut book = state
        .service
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found(id))?;

    book.views += 1;
    // A delete that landed after the read leaves nothing to count the view on.
    if !state.service.update(book.id, &book).await? {
        return Err(not_found(id));
    }

    tracing::debug!(book_id = id, views = book.views, "book viewed");
    Ok(Json(BookDetails::from_book(book, (state.current_year)())))
}

/// `POST /`: add every valid, non-duplicate book. Failures are reported
/// together and never undo the books that were added before them.
async fn add_books(
    State(state): State<BooksState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkOutcome>, AppError> {
    let books: Vec<NewBook> = bulk_items(headers, body, "No books provided.").await?;

    let mut errors = Vec::new();

    for book in &books {
        let draft = match book.validate() {
            Ok(draft) => draft,
            Err(reasons) => {
                errors.push(format!(
                    "Validation failed for book: '{}'. {}",
                    book.display_title(),
                    reasons.join(" ")
                ));
                continue;
            }
        };

        match state.service.add(&draft).await {
            Ok(_) => {}
            Err(err @ BookError::Duplicate { .. }) => {
                errors.push(format!("Error adding book '{}': {}", draft.title, err));
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !errors.is_empty() {
        tracing::info!(
            submitted = books.len(),
            failed = errors.len(),
            "bulk add partially failed"
        );
        return Err(AppError::batch_failed(errors, "Some books failed to add."));
    }

    Ok(Json(BulkOutcome {
        message: format!("{} book(s) added successfully.", books.len()),
        count: books.len(),
    }))
}

/// `PUT /{id}`: replace title, author and year. Views and the delete flag
/// are kept from the stored record.
async fn update_book(
    State(state): State<BooksState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    let Json(update) = body?;

    if update.id != id {
        return Err(BookError::MismatchedId {
            path_id: id,
            body_id: update.id,
        }
        .into());
    }

    let draft = update.validate().map_err(|reasons| {
        let details = reasons.into_iter().map(serde_json::Value::String).collect();
        AppError::validation(details, "Validation failed for book.")
    })?;

    let Some(existing) = state.service.get_by_id(id).await? else {
        return Err(not_found(id));
    };

    let replacement = Book {
        title: draft.title,
        author: draft.author,
        publication_year: draft.publication_year,
        ..existing
    };

    if !state.service.update(id, &replacement).await? {
        return Err(not_found(id));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /`: soft-delete each id. Unknown ids are reported together;
/// the deletions that did happen stay in place.
async fn delete_books(
    State(state): State<BooksState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BulkOutcome>, AppError> {
    let ids: Vec<i64> = bulk_items(headers, body, "No book IDs provided.").await?;

    let mut errors = Vec::new();
    for &id in &ids {
        if !state.service.delete(id).await? {
            errors.push(format!("Book with ID {id} not found or already deleted."));
        }
    }

    if !errors.is_empty() {
        tracing::info!(
            submitted = ids.len(),
            failed = errors.len(),
            "bulk delete partially failed"
        );
        return Err(AppError::batch_failed(errors, "Some books failed to delete."));
    }

    Ok(Json(BulkOutcome {
        message: format!("{} book(s) deleted successfully.", ids.len()),
        count: ids.len(),
    }))
}
