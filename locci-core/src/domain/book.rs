//! Catalog domain types

use serde::{Deserialize, Serialize};

/// A book in the lending catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub quantity: i32,
}
