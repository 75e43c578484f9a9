//! Lending lifecycle endpoints: requests, issues, returns, purchases

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{Issue, IssueDetails, IssueQuery},
        purchase::{CreatePurchase, Purchase, PurchaseDetails},
        request::{BorrowRequest, RequestDetails, RequestQuery},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Issue response with its originating request
#[derive(Serialize, ToSchema)]
pub struct IssueResponse {
    pub issue: Issue,
    pub request: BorrowRequest,
}

/// Request a book for borrowing
#[utoipa::path(
    post,
    path = "/books/{id}/request",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 201, description = "Request created", body = BorrowRequest),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Quota reached, already requested, or already issued")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    let request = state.services.lending.create_request(claims.user_id, book_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Withdraw an open request for a book
#[utoipa::path(
    delete,
    path = "/books/{id}/request",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Request withdrawn", body = BorrowRequest),
        (status = 404, description = "No open request for this book")
    )
)]
pub async fn withdraw_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.lending.withdraw_request(claims.user_id, book_id).await?;
    Ok(Json(request))
}

/// Deny a borrow request (librarian only)
#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "No open request with this id")
    )
)]
pub async fn reject_request(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.lending.reject_request(&claims, request_id).await?;

    notify_request_outcome(state.clone(), request.user_id, request.book_id, false);
    Ok(Json(request))
}

/// Fulfil a borrow request: create an issue and close the request (librarian only)
#[utoipa::path(
    post,
    path = "/requests/{id}/issue",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 201, description = "Issue created", body = IssueResponse),
        (status = 403, description = "Librarian role required"),
        (status = 404, description = "No open request with this id"),
        (status = 409, description = "Book already issued to this user")
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(request_id): Path<i32>,
) -> AppResult<(StatusCode, Json<IssueResponse>)> {
    let (issue, request) = state.services.lending.issue_book(&claims, request_id).await?;

    notify_request_outcome(state.clone(), request.user_id, request.book_id, true);
    Ok((StatusCode::CREATED, Json(IssueResponse { issue, request })))
}

/// Return the caller's active loan for a book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Issue returned", body = Issue),
        (status = 404, description = "No active loan for this book"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Issue>> {
    let issue = state.services.lending.return_book(&claims, book_id).await?;
    Ok(Json(issue))
}

/// Return a loan by issue id (borrower or librarian)
#[utoipa::path(
    post,
    path = "/issues/{id}/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue returned", body = Issue),
        (status = 403, description = "Not the borrower"),
        (status = 404, description = "Issue not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book_by_id(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(issue_id): Path<i32>,
) -> AppResult<Json<Issue>> {
    let issue = state.services.lending.return_book_by_id(&claims, issue_id).await?;
    Ok(Json(issue))
}

/// Buy a book
#[utoipa::path(
    post,
    path = "/books/{id}/purchase",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body = CreatePurchase,
    responses(
        (status = 201, description = "Purchase recorded", body = Purchase),
        (status = 400, description = "Invalid card fields"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Json(purchase): Json<CreatePurchase>,
) -> AppResult<(StatusCode, Json<Purchase>)> {
    purchase
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let created = state
        .services
        .lending
        .create_purchase(claims.user_id, book_id, &purchase)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// List requests: librarians see all, users their own
#[utoipa::path(
    get,
    path = "/requests",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Status filter, defaults to open")
    ),
    responses(
        (status = 200, description = "Scoped requests", body = Vec<RequestDetails>)
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<RequestDetails>>> {
    let requests = state.services.lending.list_requests(&claims, query.status).await?;
    Ok(Json(requests))
}

/// List issues: librarians see all, users their own
#[utoipa::path(
    get,
    path = "/issues",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("include_returned" = Option<bool>, Query, description = "Include returned issues")
    ),
    responses(
        (status = 200, description = "Scoped issues", body = Vec<IssueDetails>)
    )
)]
pub async fn list_issues(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<Vec<IssueDetails>>> {
    let issues = state
        .services
        .lending
        .list_issues(&claims, query.include_returned.unwrap_or(false))
        .await?;
    Ok(Json(issues))
}

/// List purchases: librarians see all, users their own
#[utoipa::path(
    get,
    path = "/purchases",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Scoped purchases", body = Vec<PurchaseDetails>)
    )
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<PurchaseDetails>>> {
    let purchases = state.services.lending.list_purchases(&claims).await?;
    Ok(Json(purchases))
}

/// Fire-and-forget outcome email, spawned after the lifecycle transaction
/// committed. Failures are logged only.
fn notify_request_outcome(state: AppState, user_id: i32, book_id: i32, issued: bool) {
    tokio::spawn(async move {
        let services = &state.services;
        let (user, book) = match (
            services.users.get_by_id(user_id).await,
            services.catalog.get_book(book_id).await,
        ) {
            (Ok(user), Ok(book)) => (user, book),
            (user, book) => {
                tracing::warn!(
                    user_id,
                    book_id,
                    "Skipping outcome email: {:?} / {:?}",
                    user.err(),
                    book.err()
                );
                return;
            }
        };

        let result = if issued {
            services.email.send_issue_notification(&user.email, &book.book.title).await
        } else {
            services.email.send_rejection_notification(&user.email, &book.book.title).await
        };
        if let Err(e) = result {
            tracing::warn!(user_id, book_id, "Failed to send outcome email: {}", e);
        }
    });
}
