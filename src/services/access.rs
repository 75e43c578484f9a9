//! Access decision layer: per-user book flags and the content gate.

use crate::{
    error::{AppError, AppResult},
    models::{book::Book, BookAccess, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct AccessService {
    repository: Repository,
}

impl AccessService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Compute the three access flags for (user, book). Pure read-only
    /// derivations over current state, never cached, so they reflect the
    /// latest committed lifecycle mutation.
    pub async fn book_access(&self, user_id: i32, book_id: i32) -> AppResult<BookAccess> {
        let requested = self
            .repository
            .requests
            .find_open_for(user_id, book_id)
            .await?
            .is_some();
        let issued = self
            .repository
            .issues
            .find_unreturned_for(user_id, book_id)
            .await?
            .is_some();
        let purchased = self.repository.purchases.exists_for(user_id, book_id).await?;

        Ok(BookAccess { requested, issued, purchased })
    }

    /// The single authorization gate for protected content. Evaluated
    /// before any byte is streamed: librarian, active loan, or purchase.
    pub async fn check_file_access(&self, claims: &UserClaims, book_id: i32) -> AppResult<Book> {
        let book = self.repository.books.get_by_id(book_id).await?;

        if claims.is_librarian() {
            return Ok(book);
        }

        let access = self.book_access(claims.user_id, book_id).await?;
        if access.grants_content() {
            Ok(book)
        } else {
            Err(AppError::Unauthorized(
                "Content access requires an active loan or a purchase".to_string(),
            ))
        }
    }
}
