//! User model, roles, and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Account role - the closed set of two variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Librarian,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Librarian => "librarian",
        }
    }

    /// Policy table: which role may perform which privileged operation.
    pub fn allows(&self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Librarian, _) => true,
            (Role::User, Capability::BorrowBooks) => true,
            (Role::User, _) => false,
        }
    }
}

/// Privileged operations gated by the role policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    BorrowBooks,
    AdjudicateRequests,
    CurateCatalog,
    ManageUsers,
    ViewAllRecords,
    RunReports,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "librarian" => Ok(Role::Librarian),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion: roles are stored as text
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <String as Encode<Postgres>>::encode(self.as_str().to_string(), buf)
    }
}

/// Listing scope: librarians see everything, users see their own rows.
/// Derived once from claims and shared by the request, issue and purchase
/// listings so the rule cannot drift between entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Owner(i32),
}

impl Scope {
    pub fn for_claims(claims: &UserClaims) -> Self {
        if claims.role.allows(Capability::ViewAllRecords) {
            Scope::All
        } else {
            Scope::Owner(claims.user_id)
        }
    }

    /// Owner filter for SQL listings: `None` means no restriction.
    /// Bound as `($1::int IS NULL OR user_id = $1)` by every scoped query.
    pub fn owner_id(&self) -> Option<i32> {
        match self {
            Scope::All => None,
            Scope::Owner(id) => Some(*id),
        }
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub about: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public user representation for lists and embedding in other payloads
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserPublic {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub image_url: Option<String>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            image_url: user.image_url,
        }
    }
}

/// Signup request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignupUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    pub about: Option<String>,
}

/// Update user request (self or librarian)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: Option<String>,
    pub about: Option<String>,
    pub image_url: Option<String>,
}

/// Role change request (librarian only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

/// User query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_librarian(&self) -> bool {
        self.role == Role::Librarian
    }

    /// Role gate used by every privileged operation
    pub fn authorize(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Role '{}' may not perform this operation",
                self.role
            )))
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role) -> UserClaims {
        UserClaims {
            sub: "test".to_string(),
            user_id: 42,
            role,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn policy_table_denies_user_privileged_operations() {
        for cap in [
            Capability::AdjudicateRequests,
            Capability::CurateCatalog,
            Capability::ManageUsers,
            Capability::ViewAllRecords,
            Capability::RunReports,
        ] {
            assert!(!Role::User.allows(cap));
            assert!(Role::Librarian.allows(cap));
        }
        assert!(Role::User.allows(Capability::BorrowBooks));
    }

    #[test]
    fn authorize_returns_forbidden_for_wrong_role() {
        let err = claims(Role::User)
            .authorize(Capability::AdjudicateRequests)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(claims(Role::Librarian)
            .authorize(Capability::AdjudicateRequests)
            .is_ok());
    }

    #[test]
    fn scope_follows_role() {
        assert_eq!(Scope::for_claims(&claims(Role::Librarian)), Scope::All);
        assert_eq!(Scope::for_claims(&claims(Role::User)), Scope::Owner(42));
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!("librarian".parse::<Role>().unwrap(), Role::Librarian);
        assert_eq!(Role::User.to_string(), "user");
        assert!("admin".parse::<Role>().is_err());
    }
}
