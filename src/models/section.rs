//! Section (catalog category) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Section model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
}

/// Create section request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSection {
    #[validate(length(min = 1, message = "Section name is required"))]
    pub name: String,
    pub description: Option<String>,
}

/// Update section request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateSection {
    #[validate(length(min = 1, message = "Section name is required"))]
    pub name: Option<String>,
    pub description: Option<String>,
}
