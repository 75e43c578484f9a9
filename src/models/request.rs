//! Borrow request model and status state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use super::book::Book;
use super::user::UserPublic;

/// Request lifecycle status.
///
/// `Open` is the only non-terminal state: it moves to `Issued` via issue
/// creation, `Closed` via user withdrawal, or `Rejected` via librarian
/// denial. There are no transitions out of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Open,
    Issued,
    Closed,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Issued => "issued",
            RequestStatus::Closed => "closed",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Open)
    }

    /// Whether the state machine permits moving to `next`.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(self, RequestStatus::Open) && next != RequestStatus::Open
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(RequestStatus::Open),
            "issued" => Ok(RequestStatus::Issued),
            "closed" => Ok(RequestStatus::Closed),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Borrow request row
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRequest {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Request with book (and, for librarians, user) resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestDetails {
    pub id: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub book: Book,
    pub user: Option<UserPublic>,
}

/// Request listing filter
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Filter by status; defaults to open requests only
    pub status: Option<RequestStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_is_the_only_non_terminal_state() {
        assert!(!RequestStatus::Open.is_terminal());
        assert!(RequestStatus::Issued.is_terminal());
        assert!(RequestStatus::Closed.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
    }

    #[test]
    fn transitions_only_leave_open() {
        for next in [RequestStatus::Issued, RequestStatus::Closed, RequestStatus::Rejected] {
            assert!(RequestStatus::Open.can_transition_to(next));
            assert!(!next.can_transition_to(RequestStatus::Open));
            assert!(!next.can_transition_to(RequestStatus::Closed));
        }
        assert!(!RequestStatus::Open.can_transition_to(RequestStatus::Open));
    }

    #[test]
    fn status_parses_from_stored_text() {
        assert_eq!("open".parse::<RequestStatus>().unwrap(), RequestStatus::Open);
        assert_eq!("rejected".parse::<RequestStatus>().unwrap(), RequestStatus::Rejected);
        assert!("expired".parse::<RequestStatus>().is_err());
    }
}
