//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        Capability, Role, SignupUser, UpdateUser, User, UserClaims, UserPublic, UserQuery,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account. The role is always `user`; librarians are
    /// only created by the startup seed or a role change by a librarian.
    pub async fn signup(&self, signup: SignupUser) -> AppResult<(String, User)> {
        signup
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.users.username_exists(&signup.username, None).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if self.repository.users.email_exists(&signup.email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hash = self.hash_password(&signup.password)?;
        let user = self
            .repository
            .users
            .create(&signup.username, &signup.email, &hash, Role::User, signup.about.as_deref())
            .await?;

        let token = self.create_token(&user)?;
        tracing::info!(user_id = user.id, "User registered");
        Ok((token, user))
    }

    /// Authenticate by email and password, returning a JWT token
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Read a profile. Self or librarian; other users are rejected with an
    /// ownership error before the row is fetched.
    pub async fn get(&self, claims: &UserClaims, id: i32) -> AppResult<User> {
        if claims.user_id != id && !claims.is_librarian() {
            return Err(AppError::Unauthorized(
                "Only the account owner or a librarian may view this profile".to_string(),
            ));
        }
        self.repository.users.get_by_id(id).await
    }

    /// List users (librarian only)
    pub async fn list(&self, claims: &UserClaims, query: &UserQuery) -> AppResult<(Vec<UserPublic>, i64)> {
        claims.authorize(Capability::ManageUsers)?;
        self.repository.users.list(query).await
    }

    /// Update a profile. Self or librarian; other users are rejected with
    /// an ownership error.
    pub async fn update(&self, claims: &UserClaims, id: i32, update: UpdateUser) -> AppResult<User> {
        if claims.user_id != id && !claims.is_librarian() {
            return Err(AppError::Unauthorized(
                "Only the account owner or a librarian may update this profile".to_string(),
            ));
        }
        update
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref username) = update.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }
        if let Some(ref email) = update.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let hash = match update.password.as_deref() {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository
            .users
            .update(
                id,
                update.username.as_deref(),
                update.email.as_deref(),
                hash.as_deref(),
                update.about.as_deref(),
                update.image_url.as_deref(),
            )
            .await
    }

    /// Change a user's role. The role field is immutable outside this
    /// librarian-gated path.
    pub async fn set_role(&self, claims: &UserClaims, id: i32, role: Role) -> AppResult<User> {
        claims.authorize(Capability::ManageUsers)?;
        let user = self.repository.users.set_role(id, role).await?;
        tracing::info!(user_id = id, role = %role, "Role updated");
        Ok(user)
    }

    /// Delete an account and cascade everything it owns
    pub async fn delete(&self, claims: &UserClaims, id: i32) -> AppResult<()> {
        if claims.user_id != id && !claims.is_librarian() {
            return Err(AppError::Unauthorized(
                "Only the account owner or a librarian may delete this account".to_string(),
            ));
        }
        self.repository.users.delete_cascading(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }

    /// Create the initial librarian account if it does not exist yet
    pub async fn seed_librarian(&self) -> AppResult<()> {
        if self
            .repository
            .users
            .get_by_email(&self.config.librarian_email)
            .await?
            .is_some()
        {
            tracing::debug!("Seed librarian already exists");
            return Ok(());
        }

        let hash = self.hash_password(&self.config.librarian_password)?;
        self.repository
            .users
            .create(
                &self.config.librarian_username,
                &self.config.librarian_email,
                &hash,
                Role::Librarian,
                Some("Librarian of the Lectern library"),
            )
            .await?;

        tracing::info!("Seed librarian created");
        Ok(())
    }
}
