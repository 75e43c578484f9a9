//! Purchases repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        purchase::{CreatePurchase, Purchase, PurchaseDetails},
        user::Scope,
    },
};

use super::{book_from_prefixed_row, user_from_prefixed_row, BOOK_COLUMNS, USER_COLUMNS};

#[derive(Clone)]
pub struct PurchasesRepository {
    pool: Pool<Postgres>,
}

impl PurchasesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert an immutable purchase record; `amount` is the book price at
    /// purchase time
    pub async fn create(
        &self,
        user_id: i32,
        book_id: i32,
        purchase: &CreatePurchase,
        amount: Option<f64>,
    ) -> AppResult<Purchase> {
        let created = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (user_id, book_id, card_number, card_holder, card_expiry, amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(&purchase.card_number)
        .bind(&purchase.card_holder)
        .bind(&purchase.card_expiry)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Whether the user has ever purchased this book
    pub async fn exists_for(&self, user_id: i32, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM purchases WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// List purchases in scope, with the referenced book resolved.
    /// Librarians (Scope::All) also get the buying user.
    pub async fn list(&self, scope: Scope) -> AppResult<Vec<PurchaseDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT p.id, p.amount, p.created_at, {BOOK_COLUMNS}, {USER_COLUMNS}
            FROM purchases p
            JOIN books b ON p.book_id = b.id
            JOIN users u ON p.user_id = u.id
            WHERE ($1::int IS NULL OR p.user_id = $1)
            ORDER BY p.created_at DESC
            "#
        ))
        .bind(scope.owner_id())
        .fetch_all(&self.pool)
        .await?;

        let include_user = scope == Scope::All;
        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            use sqlx::Row;
            result.push(PurchaseDetails {
                id: row.get("id"),
                amount: row.get("amount"),
                created_at: row.get("created_at"),
                book: book_from_prefixed_row(&row),
                user: include_user.then(|| user_from_prefixed_row(&row)),
            });
        }
        Ok(result)
    }
}
