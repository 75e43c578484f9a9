//! Reviews repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::review::{CreateReview, Review, ReviewDetails},
};

use super::{user_from_prefixed_row, USER_COLUMNS};

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new review
    pub async fn create(&self, user_id: i32, book_id: i32, review: &CreateReview) -> AppResult<Review> {
        let created = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, book_id, rating, review_text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(review.rating)
        .bind(&review.review_text)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// List reviews for a book with their authors
    pub async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<ReviewDetails>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT r.id, r.rating, r.review_text, r.created_at, {USER_COLUMNS}
            FROM reviews r
            JOIN users u ON r.user_id = u.id
            WHERE r.book_id = $1
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            use sqlx::Row;
            result.push(ReviewDetails {
                id: row.get("id"),
                rating: row.get("rating"),
                review_text: row.get("review_text"),
                created_at: row.get("created_at"),
                user: user_from_prefixed_row(&row),
            });
        }
        Ok(result)
    }
}
