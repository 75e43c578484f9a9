//! Catalog management service: sections, authors, books

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
        review::{CreateReview, Review, ReviewDetails},
        section::{CreateSection, Section, UpdateSection},
        user::{Capability, UserClaims},
    },
    repository::Repository,
};

use super::cache::CacheService;

/// Cache namespace for book listings
const BOOKS_NS: &str = "books";

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    cache: CacheService,
}

impl CatalogService {
    pub fn new(repository: Repository, cache: CacheService) -> Self {
        Self { repository, cache }
    }

    // Sections

    pub async fn list_sections(&self) -> AppResult<Vec<Section>> {
        self.repository.sections.list().await
    }

    pub async fn get_section(&self, id: i32) -> AppResult<Section> {
        self.repository.sections.get_by_id(id).await
    }

    pub async fn create_section(&self, claims: &UserClaims, section: CreateSection) -> AppResult<Section> {
        claims.authorize(Capability::CurateCatalog)?;
        section
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let created = self.repository.sections.create(&section, claims.user_id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(created)
    }

    pub async fn update_section(&self, claims: &UserClaims, id: i32, section: UpdateSection) -> AppResult<Section> {
        claims.authorize(Capability::CurateCatalog)?;
        section
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let updated = self.repository.sections.update(id, &section).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(updated)
    }

    pub async fn delete_section(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        claims.authorize(Capability::CurateCatalog)?;
        self.repository.sections.delete(id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(())
    }

    // Authors

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn get_author(&self, id: i32) -> AppResult<Author> {
        self.repository.authors.get_by_id(id).await
    }

    pub async fn create_author(&self, claims: &UserClaims, author: CreateAuthor) -> AppResult<Author> {
        claims.authorize(Capability::CurateCatalog)?;
        author
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let created = self.repository.authors.create(&author, claims.user_id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(created)
    }

    pub async fn update_author(&self, claims: &UserClaims, id: i32, author: UpdateAuthor) -> AppResult<Author> {
        claims.authorize(Capability::CurateCatalog)?;
        author
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let updated = self.repository.authors.update(id, &author).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(updated)
    }

    pub async fn delete_author(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        claims.authorize(Capability::CurateCatalog)?;
        self.repository.authors.delete(id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(())
    }

    // Books

    /// List books through the read-through cache. Listing is public data
    /// so the scope fragment only distinguishes role, not identity.
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let params = format!(
            "title={}&section={}&author={}&page={}&per_page={}",
            query.title.as_deref().unwrap_or(""),
            query.section_id.map(|v| v.to_string()).unwrap_or_default(),
            query.author_id.map(|v| v.to_string()).unwrap_or_default(),
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(20),
        );
        let key = CacheService::key(BOOKS_NS, "list", "public", &params);

        if let Some(cached) = self.cache.get_json::<(Vec<Book>, i64)>(&key).await {
            return Ok(cached);
        }

        let result = self.repository.books.list(query).await?;
        self.cache.put_json(&key, &result).await;
        Ok(result)
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    pub async fn create_book(&self, claims: &UserClaims, book: CreateBook) -> AppResult<Book> {
        claims.authorize(Capability::CurateCatalog)?;
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        self.verify_links(&book.section_ids, &book.author_ids).await?;
        let created = self.repository.books.create(&book, claims.user_id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        tracing::info!(book_id = created.id, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, claims: &UserClaims, id: i32, book: UpdateBook) -> AppResult<Book> {
        claims.authorize(Capability::CurateCatalog)?;
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if let (Some(sections), Some(authors)) = (&book.section_ids, &book.author_ids) {
            self.verify_links(sections, authors).await?;
        }
        let updated = self.repository.books.update(id, &book).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        Ok(updated)
    }

    pub async fn delete_book(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        claims.authorize(Capability::CurateCatalog)?;
        self.repository.books.delete_cascading(id).await?;
        self.cache.invalidate_namespace(BOOKS_NS).await;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// Referenced sections and authors must exist before linking
    async fn verify_links(&self, section_ids: &[i32], author_ids: &[i32]) -> AppResult<()> {
        for id in section_ids {
            self.repository.sections.get_by_id(*id).await?;
        }
        for id in author_ids {
            self.repository.authors.get_by_id(*id).await?;
        }
        Ok(())
    }

    // Reviews

    pub async fn create_review(&self, claims: &UserClaims, book_id: i32, review: CreateReview) -> AppResult<Review> {
        review
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository.reviews.create(claims.user_id, book_id, &review).await
    }

    pub async fn list_reviews(&self, book_id: i32) -> AppResult<Vec<ReviewDetails>> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository.reviews.list_for_book(book_id).await
    }
}
