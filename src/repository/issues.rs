//! Issues (loans) repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{Issue, IssueDetails},
        user::Scope,
    },
};

use super::{book_from_prefixed_row, user_from_prefixed_row, BOOK_COLUMNS, USER_COLUMNS};

#[derive(Clone)]
pub struct IssuesRepository {
    pool: Pool<Postgres>,
}

impl IssuesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get issue by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Issue> {
        sqlx::query_as::<_, Issue>("SELECT * FROM issues WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", id)))
    }

    /// Find the user's unreturned issue for a book, if any
    pub async fn find_unreturned_for(&self, user_id: i32, book_id: i32) -> AppResult<Option<Issue>> {
        let issue = sqlx::query_as::<_, Issue>(
            "SELECT * FROM issues WHERE user_id = $1 AND book_id = $2 AND NOT returned",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(issue)
    }

    /// Unreturned-issue check inside the caller's transaction (issue path)
    pub async fn exists_unreturned_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM issues WHERE user_id = $1 AND book_id = $2 AND NOT returned)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    /// Insert an issue inside the caller's transaction. Committed together
    /// with the request status update, or not at all.
    pub async fn create_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        request_id: i32,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<Issue> {
        sqlx::query_as::<_, Issue>(
            r#"
            INSERT INTO issues (request_id, user_id, book_id, returned)
            VALUES ($1, $2, $3, FALSE)
            RETURNING *
            "#,
        )
        .bind(request_id)
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            // Backstop: the partial unique index on unreturned (user_id, book_id)
            AppError::from_unique_violation(
                e,
                AppError::AlreadyIssued("Book already issued to this user".to_string()),
            )
        })
    }

    /// Flip `returned` false -> true exactly once. The `NOT returned` guard
    /// makes a second return fail rather than silently succeed; the caller
    /// distinguishes AlreadyReturned from NotFound.
    pub async fn mark_returned(&self, id: i32) -> AppResult<Issue> {
        let updated = sqlx::query_as::<_, Issue>(
            r#"
            UPDATE issues SET returned = TRUE, returned_at = $2
            WHERE id = $1 AND NOT returned
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(issue) => Ok(issue),
            None => {
                // Row exists but is already returned, or does not exist at all
                let existing = self.get_by_id(id).await?;
                debug_assert!(existing.returned);
                Err(AppError::AlreadyReturned(format!(
                    "Issue {} was already returned",
                    existing.id
                )))
            }
        }
    }

    /// List issues in scope, with the referenced book resolved.
    /// Librarians (Scope::All) also get the borrowing user.
    pub async fn list(&self, scope: Scope, include_returned: bool) -> AppResult<Vec<IssueDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT i.id, i.request_id, i.issued_at, i.returned, i.returned_at,
                   {BOOK_COLUMNS}, {USER_COLUMNS}
            FROM issues i
            JOIN books b ON i.book_id = b.id
            JOIN users u ON i.user_id = u.id
            WHERE ($1::int IS NULL OR i.user_id = $1)
              AND ($2::bool OR NOT i.returned)
            ORDER BY i.issued_at DESC
            "#
        ))
        .bind(scope.owner_id())
        .bind(include_returned)
        .fetch_all(&self.pool)
        .await?;

        let include_user = scope == Scope::All;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            use sqlx::Row;
            result.push(IssueDetails {
                id: row.get("id"),
                request_id: row.get("request_id"),
                issued_at: row.get("issued_at"),
                returned: row.get("returned"),
                returned_at: row.get("returned_at"),
                book: book_from_prefixed_row(&row),
                user: include_user.then(|| user_from_prefixed_row(&row)),
            });
        }
        Ok(result)
    }

    /// All issues with book/user/author/section names flattened for the CSV export
    pub async fn list_for_export(&self) -> AppResult<Vec<IssueExportRow>> {
        let rows = sqlx::query(
            r#"
            SELECT i.id, i.issued_at, i.returned, i.returned_at,
                   b.title as book_title, u.id as user_id, u.username,
                   COALESCE((SELECT STRING_AGG(a.name, '|' ORDER BY a.name)
                             FROM authors a JOIN book_authors ba ON ba.author_id = a.id
                             WHERE ba.book_id = b.id), '') as author_names,
                   COALESCE((SELECT STRING_AGG(s.name, '|' ORDER BY s.name)
                             FROM sections s JOIN book_sections bs ON bs.section_id = s.id
                             WHERE bs.book_id = b.id), '') as section_names
            FROM issues i
            JOIN books b ON i.book_id = b.id
            JOIN users u ON i.user_id = u.id
            ORDER BY i.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            use sqlx::Row;
            result.push(IssueExportRow {
                id: row.get("id"),
                book_title: row.get("book_title"),
                author_names: row.get("author_names"),
                section_names: row.get("section_names"),
                user_id: row.get("user_id"),
                username: row.get("username"),
                issued_at: row.get("issued_at"),
                returned: row.get("returned"),
                returned_at: row.get("returned_at"),
            });
        }
        Ok(result)
    }

    /// Total issues ever created (monthly report input)
    pub async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issues")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Flattened issue row for the CSV export
#[derive(Debug, Clone)]
pub struct IssueExportRow {
    pub id: i32,
    pub book_title: String,
    pub author_names: String,
    pub section_names: String,
    pub user_id: i32,
    pub username: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub returned: bool,
    pub returned_at: Option<chrono::DateTime<chrono::Utc>>,
}
