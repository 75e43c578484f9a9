//! Sections repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::section::{CreateSection, Section, UpdateSection},
};

#[derive(Clone)]
pub struct SectionsRepository {
    pool: Pool<Postgres>,
}

impl SectionsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get section by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Section> {
        sqlx::query_as::<_, Section>("SELECT * FROM sections WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Section with id {} not found", id)))
    }

    /// List all sections
    pub async fn list(&self) -> AppResult<Vec<Section>> {
        let sections = sqlx::query_as::<_, Section>("SELECT * FROM sections ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(sections)
    }

    /// Create a new section
    pub async fn create(&self, section: &CreateSection, created_by: i32) -> AppResult<Section> {
        sqlx::query_as::<_, Section>(
            r#"
            INSERT INTO sections (name, description, created_by)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&section.name)
        .bind(&section.description)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                AppError::Conflict(format!("Section '{}' already exists", section.name)),
            )
        })
    }

    /// Update a section
    pub async fn update(&self, id: i32, section: &UpdateSection) -> AppResult<Section> {
        sqlx::query_as::<_, Section>(
            r#"
            UPDATE sections SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&section.name)
        .bind(&section.description)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Section with id {} not found", id)))
    }

    /// Delete a section; link rows to books go with it
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM book_sections WHERE section_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM sections WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Section with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Book counts per section (monthly report input)
    pub async fn book_counts(&self) -> AppResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT s.name, COUNT(bs.book_id)
            FROM sections s
            LEFT JOIN book_sections bs ON bs.section_id = s.id
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
