//! Purchase model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::Book;
use super::user::UserPublic;

/// Purchase row. Immutable once created; card fields are stored as opaque
/// strings, never validated or charged.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Purchase {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    #[serde(skip_serializing)]
    pub card_number: String,
    pub card_holder: String,
    #[serde(skip_serializing)]
    pub card_expiry: String,
    /// Book price captured at purchase time
    pub amount: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Purchase with book (and, for librarians, user) resolved for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseDetails {
    pub id: i32,
    pub amount: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub book: Book,
    pub user: Option<UserPublic>,
}

/// Create purchase request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchase {
    #[validate(length(min = 12, max = 19, message = "Card number must be 12-19 digits"))]
    pub card_number: String,
    #[validate(length(min = 1, message = "Card holder name is required"))]
    pub card_holder: String,
    #[validate(length(min = 4, max = 7, message = "Card expiry must look like MM/YY"))]
    pub card_expiry: String,
}
