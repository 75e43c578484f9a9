//! Lending lifecycle engine: request -> issue -> return, plus purchases.
//!
//! Every operation runs its precondition checks before any mutation and
//! keeps check-then-write inside one transaction. Per-user invariants
//! (the open-request quota) serialize on the user row lock; the partial
//! unique indexes on open requests and unreturned issues are the
//! store-level backstop for same-pair races.

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{Issue, IssueDetails},
        purchase::{CreatePurchase, Purchase, PurchaseDetails},
        request::{BorrowRequest, RequestDetails, RequestStatus},
        user::{Capability, Scope, UserClaims},
    },
    repository::Repository,
};

/// Maximum simultaneously open requests per user. Open requests only:
/// closed, rejected and issued requests do not count against the quota.
pub const OPEN_REQUEST_QUOTA: i64 = 5;

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create an open borrow request for (user, book).
    ///
    /// Checks run in order, first failure wins: quota, conflicting active
    /// loan, duplicate open request. Concurrent creates for the same user
    /// serialize on the user row lock, so the open-request count taken
    /// after it includes whatever the transaction ahead of us committed;
    /// locking only the open request rows would miss rows inserted after
    /// our snapshot.
    pub async fn create_request(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRequest> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let mut tx = self.repository.pool.begin().await?;

        self.repository.users.lock_row_in(&mut tx, user_id).await?;

        let open_requests = self
            .repository
            .requests
            .open_for_user_in(&mut tx, user_id)
            .await?;

        if open_requests.len() as i64 >= OPEN_REQUEST_QUOTA {
            return Err(AppError::QuotaExceeded(format!(
                "At most {} open requests allowed",
                OPEN_REQUEST_QUOTA
            )));
        }

        if self
            .repository
            .issues
            .exists_unreturned_in(&mut tx, user_id, book_id)
            .await?
        {
            return Err(AppError::AlreadyIssued(
                "Book is already issued to you".to_string(),
            ));
        }

        if open_requests.iter().any(|r| r.book_id == book_id) {
            return Err(AppError::DuplicateRequest(
                "Book already requested".to_string(),
            ));
        }

        let request = self.repository.requests.create_in(&mut tx, user_id, book_id).await?;
        tx.commit().await?;

        tracing::info!(user_id, book_id, request_id = request.id, "Borrow request created");
        Ok(request)
    }

    /// Withdraw the user's open request for a book. The row is kept with
    /// status `closed` as an audit trail.
    pub async fn withdraw_request(&self, user_id: i32, book_id: i32) -> AppResult<BorrowRequest> {
        let request = self
            .repository
            .requests
            .find_open_for(user_id, book_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No open request for book {}", book_id))
            })?;

        self.repository.requests.resolve(request.id, RequestStatus::Closed).await
    }

    /// Librarian denial of a request
    pub async fn reject_request(&self, claims: &UserClaims, request_id: i32) -> AppResult<BorrowRequest> {
        claims.authorize(Capability::AdjudicateRequests)?;

        // resolve() only matches open rows, so terminal requests 404 here
        self.repository.requests.resolve(request_id, RequestStatus::Rejected).await
    }

    /// Fulfil a request: create an Issue and mark the request `issued`,
    /// atomically. Guards against a second open request for a pair that
    /// already holds an active loan.
    pub async fn issue_book(&self, claims: &UserClaims, request_id: i32) -> AppResult<(Issue, BorrowRequest)> {
        claims.authorize(Capability::AdjudicateRequests)?;

        let request = self.repository.requests.get_by_id(request_id).await?;
        if request.status != RequestStatus::Open {
            return Err(AppError::NotFound(format!("No open request with id {}", request_id)));
        }

        let mut tx = self.repository.pool.begin().await?;

        if self
            .repository
            .issues
            .exists_unreturned_in(&mut tx, request.user_id, request.book_id)
            .await?
        {
            return Err(AppError::AlreadyIssued(
                "Book is already issued to this user".to_string(),
            ));
        }

        let issue = self
            .repository
            .issues
            .create_in(&mut tx, request.id, request.user_id, request.book_id)
            .await?;
        let request = self
            .repository
            .requests
            .resolve_in(&mut tx, request.id, RequestStatus::Issued)
            .await?;

        tx.commit().await?;

        tracing::info!(
            issue_id = issue.id,
            request_id = request.id,
            user_id = request.user_id,
            book_id = request.book_id,
            "Book issued"
        );
        Ok((issue, request))
    }

    /// Return the actor's active loan for a book
    pub async fn return_book(&self, claims: &UserClaims, book_id: i32) -> AppResult<Issue> {
        let issue = self
            .repository
            .issues
            .find_unreturned_for(claims.user_id, book_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No active loan for book {}", book_id))
            })?;

        self.finish_return(claims, issue.id, issue.user_id).await
    }

    /// Return a loan by issue id. Owner-or-librarian, same rule as the
    /// by-book path.
    pub async fn return_book_by_id(&self, claims: &UserClaims, issue_id: i32) -> AppResult<Issue> {
        let issue = self.repository.issues.get_by_id(issue_id).await?;
        self.finish_return(claims, issue.id, issue.user_id).await
    }

    async fn finish_return(&self, claims: &UserClaims, issue_id: i32, owner_id: i32) -> AppResult<Issue> {
        if claims.user_id != owner_id && !claims.is_librarian() {
            return Err(AppError::Unauthorized(
                "Only the borrower or a librarian may return this issue".to_string(),
            ));
        }

        let issue = self.repository.issues.mark_returned(issue_id).await?;
        tracing::info!(issue_id, user_id = owner_id, book_id = issue.book_id, "Book returned");
        Ok(issue)
    }

    /// Record a purchase. No inventory or gateway semantics; card fields
    /// are stored verbatim and the book's current price is captured.
    pub async fn create_purchase(
        &self,
        user_id: i32,
        book_id: i32,
        purchase: &CreatePurchase,
    ) -> AppResult<Purchase> {
        let book = self.repository.books.get_by_id(book_id).await?;

        let created = self
            .repository
            .purchases
            .create(user_id, book_id, purchase, book.price)
            .await?;

        tracing::info!(user_id, book_id, purchase_id = created.id, "Book purchased");
        Ok(created)
    }

    /// Scoped request listing; defaults to open requests
    pub async fn list_requests(
        &self,
        claims: &UserClaims,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<RequestDetails>> {
        let scope = Scope::for_claims(claims);
        self.repository
            .requests
            .list(scope, status.or(Some(RequestStatus::Open)))
            .await
    }

    /// Scoped issue listing; defaults to active loans
    pub async fn list_issues(
        &self,
        claims: &UserClaims,
        include_returned: bool,
    ) -> AppResult<Vec<IssueDetails>> {
        let scope = Scope::for_claims(claims);
        self.repository.issues.list(scope, include_returned).await
    }

    /// Scoped purchase listing
    pub async fn list_purchases(&self, claims: &UserClaims) -> AppResult<Vec<PurchaseDetails>> {
        let scope = Scope::for_claims(claims);
        self.repository.purchases.list(scope).await
    }
}
