//! Catalog API Handlers

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use locci_core::domain::book::Book;
use serde::Deserialize;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};

/// `?id=` query of the stock endpoints
#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub id: Option<String>,
}

impl BookQuery {
    fn require_id(self) -> ApiResult<String> {
        self.id
            .ok_or_else(|| ApiError::BadRequest("Missing id query parameter.".to_string()))
    }
}

/// GET /books
pub async fn list_books(State(state): State<AppState>) -> Json<Vec<Book>> {
    tracing::debug!("Listing books");
    Json(state.books.list().await)
}

/// GET /books/{id}
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Book>> {
    tracing::debug!("Getting book: {}", id);
    Ok(Json(state.books.get(&id).await?))
}

/// POST /books
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<Book>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let Json(book) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let book = state.books.create(book).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PATCH /checkout?id=
pub async fn checkout_book(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Json<Book>> {
    let id = query.require_id()?;
    tracing::info!("Checking out book: {}", id);
    Ok(Json(state.books.checkout(&id).await?))
}

/// PATCH /return?id=
pub async fn return_book(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Json<Book>> {
    let id = query.require_id()?;
    tracing::info!("Returning book: {}", id);
    Ok(Json(state.books.give_back(&id).await?))
}
