//! Issue (loan) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::Book;
use super::user::UserPublic;

/// Issue row: an active or historical loan, spawned by exactly one request
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Issue {
    pub id: i32,
    /// The request this issue was created from, retained for audit
    pub request_id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub issued_at: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
}

/// Issue with book (and, for librarians, user) resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssueDetails {
    pub id: i32,
    pub request_id: i32,
    pub issued_at: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
    pub book: Book,
    pub user: Option<UserPublic>,
}

/// Issue listing filter
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct IssueQuery {
    /// Include returned issues; defaults to active loans only
    pub include_returned: Option<bool>,
}
