//! Book model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::author::Author;
use super::section::Section;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub page_count: Option<i32>,
    /// Path to the protected PDF, relative to the content directory
    #[serde(skip_serializing)]
    pub content_path: Option<String>,
    pub cover_path: Option<String>,
    pub publication_year: Option<i32>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Book with its sections and authors resolved
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub sections: Vec<Section>,
    pub authors: Vec<Author>,
}

/// Per-user relationship to a book, derived from current lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BookAccess {
    /// An open request exists for this (user, book) pair
    pub requested: bool,
    /// An unreturned issue exists for this pair
    pub issued: bool,
    /// Any purchase exists for this pair
    pub purchased: bool,
}

impl BookAccess {
    /// Content is downloadable with any of these; librarians bypass this.
    pub fn grants_content(&self) -> bool {
        self.issued || self.purchased
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Book title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub page_count: Option<i32>,
    pub content_path: Option<String>,
    pub cover_path: Option<String>,
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub section_ids: Vec<i32>,
    #[serde(default)]
    pub author_ids: Vec<i32>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Book title is required"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub page_count: Option<i32>,
    pub content_path: Option<String>,
    pub cover_path: Option<String>,
    pub publication_year: Option<i32>,
    pub section_ids: Option<Vec<i32>>,
    pub author_ids: Option<Vec<i32>>,
}

/// Book query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub section_id: Option<i32>,
    pub author_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_flags_gate_content() {
        assert!(!BookAccess::default().grants_content());
        let issued = BookAccess { issued: true, ..Default::default() };
        let purchased = BookAccess { purchased: true, ..Default::default() };
        let requested = BookAccess { requested: true, ..Default::default() };
        assert!(issued.grants_content());
        assert!(purchased.grants_content());
        assert!(!requested.grants_content());
    }
}
