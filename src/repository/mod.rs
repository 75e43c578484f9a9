//! Repository layer for database operations

pub mod authors;
pub mod books;
pub mod issues;
pub mod purchases;
pub mod requests;
pub mod reviews;
pub mod sections;
pub mod users;

use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

use crate::models::{book::Book, user::UserPublic};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub sections: sections::SectionsRepository,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub requests: requests::RequestsRepository,
    pub issues: issues::IssuesRepository,
    pub purchases: purchases::PurchasesRepository,
    pub reviews: reviews::ReviewsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            sections: sections::SectionsRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            requests: requests::RequestsRepository::new(pool.clone()),
            issues: issues::IssuesRepository::new(pool.clone()),
            purchases: purchases::PurchasesRepository::new(pool.clone()),
            reviews: reviews::ReviewsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Extract a Book from a row whose book columns are aliased with a `b_` prefix.
/// Shared by the lifecycle listing queries, which all join against books.
pub(crate) fn book_from_prefixed_row(row: &PgRow) -> Book {
    Book {
        id: row.get("b_id"),
        title: row.get("b_title"),
        description: row.get("b_description"),
        price: row.get("b_price"),
        page_count: row.get("b_page_count"),
        content_path: row.get("b_content_path"),
        cover_path: row.get("b_cover_path"),
        publication_year: row.get("b_publication_year"),
        created_by: row.get("b_created_by"),
        created_at: row.get("b_created_at"),
    }
}

/// SQL fragment selecting the `b_` aliased book columns.
pub(crate) const BOOK_COLUMNS: &str = "b.id as b_id, b.title as b_title, b.description as b_description, \
     b.price as b_price, b.page_count as b_page_count, b.content_path as b_content_path, \
     b.cover_path as b_cover_path, b.publication_year as b_publication_year, \
     b.created_by as b_created_by, b.created_at as b_created_at";

/// Extract a UserPublic from a row with `u_` prefixed aliases.
pub(crate) fn user_from_prefixed_row(row: &PgRow) -> UserPublic {
    UserPublic {
        id: row.get("u_id"),
        username: row.get("u_username"),
        email: row.get("u_email"),
        role: row.get("u_role"),
        image_url: row.get("u_image_url"),
    }
}

/// SQL fragment selecting the `u_` aliased user columns.
pub(crate) const USER_COLUMNS: &str = "u.id as u_id, u.username as u_username, u.email as u_email, \
     u.role as u_role, u.image_url as u_image_url";
