//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, catalog, health, lending, reports, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lectern API",
        version = "1.0.0",
        description = "Digital library lending REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::signup,
        auth::login,
        auth::me,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::update_role,
        users::delete_user,
        // Sections and authors
        catalog::list_sections,
        catalog::get_section,
        catalog::create_section,
        catalog::update_section,
        catalog::delete_section,
        catalog::list_authors,
        catalog::get_author,
        catalog::create_author,
        catalog::update_author,
        catalog::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        books::get_book_access,
        books::download_book_content,
        books::create_review,
        books::list_reviews,
        // Lending
        lending::create_request,
        lending::withdraw_request,
        lending::reject_request,
        lending::issue_book,
        lending::return_book,
        lending::return_book_by_id,
        lending::create_purchase,
        lending::list_requests,
        lending::list_issues,
        lending::list_purchases,
        // Reports
        reports::export_issues_csv,
        reports::get_stats,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::AuthResponse,
            // Users
            crate::models::user::Role,
            crate::models::user::User,
            crate::models::user::UserPublic,
            crate::models::user::SignupUser,
            crate::models::user::UpdateUser,
            crate::models::user::UpdateRole,
            // Catalog
            crate::models::section::Section,
            crate::models::section::CreateSection,
            crate::models::section::UpdateSection,
            crate::models::author::Author,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::BookAccess,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::review::Review,
            crate::models::review::ReviewDetails,
            crate::models::review::CreateReview,
            // Lending
            crate::models::request::RequestStatus,
            crate::models::request::BorrowRequest,
            crate::models::request::RequestDetails,
            crate::models::issue::Issue,
            crate::models::issue::IssueDetails,
            crate::models::purchase::Purchase,
            crate::models::purchase::PurchaseDetails,
            crate::models::purchase::CreatePurchase,
            lending::IssueResponse,
            // Reports
            reports::ReportAccepted,
            reports::StatsResponse,
            reports::SectionCount,
            reports::BookRequestCount,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "User management"),
        (name = "catalog", description = "Sections and authors"),
        (name = "books", description = "Book catalog, access flags, and content"),
        (name = "lending", description = "Requests, issues, returns, purchases"),
        (name = "reports", description = "Reports and statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
