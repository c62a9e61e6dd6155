//! Catalog endpoints

use crate::LocciClient;
use crate::error::Result;
use locci_core::domain::book::Book;

impl LocciClient {
    pub async fn list_books(&self) -> Result<Vec<Book>> {
        let url = format!("{}/books", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_book(&self, id: &str) -> Result<Book> {
        let url = format!("{}/books/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Add a book; fails with 400 if the id is taken
    pub async fn create_book(&self, book: &Book) -> Result<Book> {
        let url = format!("{}/books", self.base_url);
        let response = self.client.post(&url).json(book).send().await?;

        self.handle_response(response).await
    }

    /// Take one copy out of stock
    pub async fn checkout_book(&self, id: &str) -> Result<Book> {
        let url = format!("{}/checkout", self.base_url);
        let response = self
            .client
            .patch(&url)
            .query(&[("id", id)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Put one copy back into stock
    pub async fn return_book(&self, id: &str) -> Result<Book> {
        let url = format!("{}/return", self.base_url);
        let response = self
            .client
            .patch(&url)
            .query(&[("id", id)])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
