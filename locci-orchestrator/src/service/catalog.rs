//! Catalog Service
//!
//! Owned book inventory behind the [`BookStore`] trait.

use async_trait::async_trait;
use locci_core::domain::book::Book;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Catalog errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Book not found.")]
    NotFound(String),

    #[error("Book not available.")]
    Unavailable(String),

    #[error("Book {0} already exists.")]
    AlreadyExists(String),

    #[error("Book stock is full.")]
    StockFull(String),
}

/// Storage of the book catalog
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn list(&self) -> Vec<Book>;

    async fn get(&self, id: &str) -> Result<Book, CatalogError>;

    async fn create(&self, book: Book) -> Result<Book, CatalogError>;

    /// Takes one copy out of stock
    async fn checkout(&self, id: &str) -> Result<Book, CatalogError>;

    /// Puts one copy back into stock
    async fn give_back(&self, id: &str) -> Result<Book, CatalogError>;
}

/// Process-local [`BookStore`]
///
/// Books are listed in the order they were added.
#[derive(Debug, Default)]
pub struct InMemoryBookStore {
    books: RwLock<Vec<Book>>,
}

impl InMemoryBookStore {
    pub fn new(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            books: RwLock::new(books.into_iter().collect()),
        }
    }

    /// Store holding the starter inventory
    pub fn seeded() -> Self {
        Self::new([
            Book {
                id: "1".to_string(),
                title: "In Search of Lost Time".to_string(),
                author: "Marcel Proust".to_string(),
                quantity: 2,
            },
            Book {
                id: "2".to_string(),
                title: "The Great Gatsby".to_string(),
                author: "F. Scott Fitzgerald".to_string(),
                quantity: 5,
            },
            Book {
                id: "3".to_string(),
                title: "War and Peace".to_string(),
                author: "Leo Tolstoy".to_string(),
                quantity: 6,
            },
        ])
    }

    // A panic while holding the lock leaves the list itself consistent
    fn read(&self) -> RwLockReadGuard<'_, Vec<Book>> {
        self.books.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Book>> {
        self.books.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn find_mut<'a>(books: &'a mut [Book], id: &str) -> Result<&'a mut Book, CatalogError> {
    books
        .iter_mut()
        .find(|b| b.id == id)
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn list(&self) -> Vec<Book> {
        self.read().clone()
    }

    async fn get(&self, id: &str) -> Result<Book, CatalogError> {
        self.read()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    async fn create(&self, book: Book) -> Result<Book, CatalogError> {
        let mut books = self.write();
        if books.iter().any(|b| b.id == book.id) {
            return Err(CatalogError::AlreadyExists(book.id));
        }

        tracing::info!("Adding book {} ({})", book.id, book.title);
        books.push(book.clone());
        Ok(book)
    }

    async fn checkout(&self, id: &str) -> Result<Book, CatalogError> {
        let mut books = self.write();
        let book = find_mut(&mut books, id)?;

        if book.quantity <= 0 {
            return Err(CatalogError::Unavailable(id.to_string()));
        }

        book.quantity -= 1;
        Ok(book.clone())
    }

    async fn give_back(&self, id: &str) -> Result<Book, CatalogError> {
        let mut books = self.write();
        let book = find_mut(&mut books, id)?;

        book.quantity = book
            .quantity
            .checked_add(1)
            .ok_or_else(|| CatalogError::StockFull(id.to_string()))?;
        Ok(book.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_catalog() {
        let store = InMemoryBookStore::seeded();
        let books = store.list().await;
        assert_eq!(books.len(), 3);
        assert_eq!(store.get("2").await.unwrap().title, "The Great Gatsby");
    }

    #[tokio::test]
    async fn test_checkout_until_unavailable() {
        let store = InMemoryBookStore::seeded();

        assert_eq!(store.checkout("1").await.unwrap().quantity, 1);
        assert_eq!(store.checkout("1").await.unwrap().quantity, 0);
        assert_eq!(
            store.checkout("1").await.unwrap_err(),
            CatalogError::Unavailable("1".to_string())
        );
        assert_eq!(store.get("1").await.unwrap().quantity, 0);
    }

    #[tokio::test]
    async fn test_give_back_increments() {
        let store = InMemoryBookStore::seeded();
        assert_eq!(store.give_back("3").await.unwrap().quantity, 7);
    }

    #[tokio::test]
    async fn test_unknown_book() {
        let store = InMemoryBookStore::seeded();
        assert!(matches!(
            store.checkout("42").await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            store.give_back("42").await,
            Err(CatalogError::NotFound(_))
        ));
        assert_eq!(
            store.get("42").await.unwrap_err().to_string(),
            "Book not found."
        );
    }

    #[tokio::test]
    async fn test_list_keeps_insertion_order() {
        let store = InMemoryBookStore::seeded();
        for id in ["10", "4"] {
            store
                .create(Book {
                    id: id.to_string(),
                    title: format!("Volume {}", id),
                    author: "Anonymous".to_string(),
                    quantity: 1,
                })
                .await
                .unwrap();
        }

        let ids: Vec<String> = store.list().await.into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["1", "2", "3", "10", "4"]);
    }

    #[tokio::test]
    async fn test_give_back_at_max_stock_is_rejected() {
        let store = InMemoryBookStore::new([Book {
            id: "7".to_string(),
            title: "Infinite Jest".to_string(),
            author: "David Foster Wallace".to_string(),
            quantity: i32::MAX,
        }]);

        assert_eq!(
            store.give_back("7").await.unwrap_err(),
            CatalogError::StockFull("7".to_string())
        );
        assert_eq!(store.get("7").await.unwrap().quantity, i32::MAX);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = InMemoryBookStore::default();
        let book = Book {
            id: "9".to_string(),
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            quantity: 1,
        };

        store.create(book.clone()).await.unwrap();
        assert_eq!(
            store.create(book).await.unwrap_err(),
            CatalogError::AlreadyExists("9".to_string())
        );
        assert_eq!(store.list().await.len(), 1);
    }
}
