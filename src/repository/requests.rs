//! Borrow requests repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        request::{BorrowRequest, RequestDetails, RequestStatus},
        user::Scope,
    },
};

use super::{book_from_prefixed_row, user_from_prefixed_row, BOOK_COLUMNS, USER_COLUMNS};

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
    }

    /// Find the user's open request for a book, if any
    pub async fn find_open_for(&self, user_id: i32, book_id: i32) -> AppResult<Option<BorrowRequest>> {
        let request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM requests WHERE user_id = $1 AND book_id = $2 AND status = 'open'",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    /// All of the user's open requests, read inside the caller's
    /// transaction. Callers that need this count to be race-free must hold
    /// the user row lock first; under READ COMMITTED this statement then
    /// runs on a fresh snapshot that includes rows committed by the
    /// transaction that previously held the lock.
    pub async fn open_for_user_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
    ) -> AppResult<Vec<BorrowRequest>> {
        let requests = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM requests WHERE user_id = $1 AND status = 'open'",
        )
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(requests)
    }

    /// Insert a new open request inside the caller's transaction
    pub async fn create_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO requests (user_id, book_id, status)
            VALUES ($1, $2, 'open')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            // Backstop: the partial unique index on open (user_id, book_id)
            AppError::from_unique_violation(
                e,
                AppError::DuplicateRequest("Book already requested".to_string()),
            )
        })
    }

    /// Move an open request to a terminal status. The `status = 'open'`
    /// guard keeps terminal states terminal even under a race.
    pub async fn resolve(&self, id: i32, status: RequestStatus) -> AppResult<BorrowRequest> {
        debug_assert!(RequestStatus::Open.can_transition_to(status));
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE requests SET status = $2, resolved_at = $3
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No open request with id {}", id)))
    }

    /// Same as [`resolve`], inside the caller's transaction (issue path)
    pub async fn resolve_in(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: i32,
        status: RequestStatus,
    ) -> AppResult<BorrowRequest> {
        debug_assert!(RequestStatus::Open.can_transition_to(status));
        sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE requests SET status = $2, resolved_at = $3
            WHERE id = $1 AND status = 'open'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No open request with id {}", id)))
    }

    /// List requests in scope, with the referenced book resolved.
    /// Librarians (Scope::All) also get the owning user.
    pub async fn list(
        &self,
        scope: Scope,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<RequestDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT r.id, r.status, r.created_at, r.resolved_at, {BOOK_COLUMNS}, {USER_COLUMNS}
            FROM requests r
            JOIN books b ON r.book_id = b.id
            JOIN users u ON r.user_id = u.id
            WHERE ($1::int IS NULL OR r.user_id = $1)
              AND ($2::text IS NULL OR r.status = $2)
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(scope.owner_id())
        .bind(status.map(|s| s.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;

        let include_user = scope == Scope::All;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            use sqlx::Row;
            result.push(RequestDetails {
                id: row.get("id"),
                status: row.get("status"),
                created_at: row.get("created_at"),
                resolved_at: row.get("resolved_at"),
                book: book_from_prefixed_row(&row),
                user: include_user.then(|| user_from_prefixed_row(&row)),
            });
        }
        Ok(result)
    }

    /// Total requests ever made (monthly report input)
    pub async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Rejected requests (monthly report input)
    pub async fn count_rejected(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE status = 'rejected'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
