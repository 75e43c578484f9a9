//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
        section::Section,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Existence check used by lifecycle preconditions
    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Get book with sections and authors resolved
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.get_by_id(id).await?;
        let sections = self.sections_for(id).await?;
        let authors = self.authors_for(id).await?;
        Ok(BookDetails { book, sections, authors })
    }

    /// Sections linked to a book
    pub async fn sections_for(&self, book_id: i32) -> AppResult<Vec<Section>> {
        let sections = sqlx::query_as::<_, Section>(
            r#"
            SELECT s.* FROM sections s
            JOIN book_sections bs ON bs.section_id = s.id
            WHERE bs.book_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sections)
    }

    /// Authors linked to a book
    pub async fn authors_for(&self, book_id: i32) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            r#"
            SELECT a.* FROM authors a
            JOIN book_authors ba ON ba.author_id = a.id
            WHERE ba.book_id = $1
            ORDER BY a.name
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    /// List books with filters and pagination
    pub async fn list(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let title_filter = query.title.as_deref().map(|t| format!("%{}%", t));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT DISTINCT b.* FROM books b
            LEFT JOIN book_sections bs ON bs.book_id = b.id
            LEFT JOIN book_authors ba ON ba.book_id = b.id
            WHERE ($1::text IS NULL OR b.title ILIKE $1)
              AND ($2::int IS NULL OR bs.section_id = $2)
              AND ($3::int IS NULL OR ba.author_id = $3)
            ORDER BY b.title
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&title_filter)
        .bind(query.section_id)
        .bind(query.author_id)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT b.id) FROM books b
            LEFT JOIN book_sections bs ON bs.book_id = b.id
            LEFT JOIN book_authors ba ON ba.book_id = b.id
            WHERE ($1::text IS NULL OR b.title ILIKE $1)
              AND ($2::int IS NULL OR bs.section_id = $2)
              AND ($3::int IS NULL OR ba.author_id = $3)
            "#,
        )
        .bind(&title_filter)
        .bind(query.section_id)
        .bind(query.author_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Create a book and its section/author links in one transaction
    pub async fn create(&self, book: &CreateBook, created_by: i32) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, description, price, page_count, content_path,
                               cover_path, publication_year, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price)
        .bind(book.page_count)
        .bind(&book.content_path)
        .bind(&book.cover_path)
        .bind(book.publication_year)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                AppError::Conflict(format!("Book '{}' already exists", book.title)),
            )
        })?;

        for section_id in &book.section_ids {
            sqlx::query("INSERT INTO book_sections (book_id, section_id) VALUES ($1, $2)")
                .bind(created.id)
                .bind(section_id)
                .execute(&mut *tx)
                .await?;
        }
        for author_id in &book.author_ids {
            sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                .bind(created.id)
                .bind(author_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    /// Update a book; when section/author id lists are given the link
    /// tables are rewritten wholesale
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                page_count = COALESCE($5, page_count),
                content_path = COALESCE($6, content_path),
                cover_path = COALESCE($7, cover_path),
                publication_year = COALESCE($8, publication_year)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.price)
        .bind(book.page_count)
        .bind(&book.content_path)
        .bind(&book.cover_path)
        .bind(book.publication_year)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(ref section_ids) = book.section_ids {
            sqlx::query("DELETE FROM book_sections WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for section_id in section_ids {
                sqlx::query("INSERT INTO book_sections (book_id, section_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(section_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        if let Some(ref author_ids) = book.author_ids {
            sqlx::query("DELETE FROM book_authors WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for author_id in author_ids {
                sqlx::query("INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)")
                    .bind(id)
                    .bind(author_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book and everything referencing it.
    ///
    /// Explicit transactional fan-out: requests, issues, purchases,
    /// reviews and link rows all go with the book.
    pub async fn delete_cascading(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        for table in ["reviews", "purchases", "issues", "requests", "book_sections", "book_authors"] {
            sqlx::query(&format!("DELETE FROM {} WHERE book_id = $1", table))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Most-requested book titles (monthly report input)
    pub async fn top_requested(&self, limit: i64) -> AppResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT b.title, COUNT(r.id)
            FROM books b
            LEFT JOIN requests r ON r.book_id = b.id
            GROUP BY b.id
            ORDER BY COUNT(r.id) DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
