//! User service
//!
//! Registration and credential checks for recipe authors, plus the account
//! moderation used by staff. Token issuance lives in `services::token`.
//!
//! The first registered user becomes staff.

use crate::db::repositories::UserRepository;
use crate::models::{CreateUserInput, User};
use crate::services::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::services::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

/// Maximum username length
const MAX_USERNAME_LENGTH: usize = 150;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Unknown username, wrong password or inactive account
    #[error("No active account found with the given credentials")]
    AuthenticationError,

    /// User not found
    #[error("User not found: {0}")]
    NotFound(String),

    /// Field-level validation failures
    #[error("Validation error")]
    ValidationError(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    /// Register a new author
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a blank, too long or taken username, or a
    ///   password shorter than `MIN_PASSWORD_LENGTH`
    /// - `InternalError` for database errors
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let mut errors = FieldErrors::new();

        if username.is_empty() {
            errors.add("username", "This field may not be blank.");
        } else if username.chars().count() > MAX_USERNAME_LENGTH {
            errors.add(
                "username",
                format!("Ensure this field has no more than {} characters.", MAX_USERNAME_LENGTH),
            );
        }
        if input.password.is_empty() {
            errors.add("password", "This field may not be blank.");
        } else if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add(
                "password",
                format!(
                    "This password is too short. It must contain at least {} characters.",
                    MIN_PASSWORD_LENGTH
                ),
            );
        }

        if !username.is_empty()
            && self
                .user_repo
                .get_by_username(&username)
                .await
                .context("Failed to check username")?
                .is_some()
        {
            errors.add("username", "A user with that username already exists.");
        }

        if !errors.is_empty() {
            return Err(UserServiceError::ValidationError(errors));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let mut user = User::new(username, input.email.trim().to_string(), password_hash);
        user.first_name = input.first_name.trim().to_string();
        user.last_name = input.last_name.trim().to_string();
        user.is_staff = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?
            == 0;

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(
            user_id = created.id,
            username = %created.username,
            is_staff = created.is_staff,
            "Registered author"
        );
        Ok(created)
    }

    /// Check a username/password pair
    ///
    /// Every failure (unknown user, wrong password, inactive account) maps to
    /// the same `AuthenticationError` so callers cannot tell which usernames exist.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::AuthenticationError)?;

        let valid = verify_password(password, &user.password_hash).context("Failed to verify password")?;
        if !valid || !user.is_active {
            return Err(UserServiceError::AuthenticationError);
        }

        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")
            .map_err(Into::into)
    }

    /// Get a user by ID, but only while the account is active
    pub async fn get_active(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.get_by_id(id).await?.filter(|user| user.is_active))
    }

    /// Enable or disable an account
    pub async fn set_active(&self, id: i64, active: bool) -> Result<User, UserServiceError> {
        let mut user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| UserServiceError::NotFound(format!("User with ID {} not found", id)))?;

        self.user_repo
            .set_active(id, active)
            .await
            .context("Failed to update user status")?;

        tracing::info!(user_id = id, active, "Changed account status");
        user.is_active = active;
        Ok(user)
    }

    /// Delete an account together with its recipes
    pub async fn delete(&self, id: i64) -> Result<(), UserServiceError> {
        if self.get_by_id(id).await?.is_none() {
            return Err(UserServiceError::NotFound(format!("User with ID {} not found", id)));
        }

        self.user_repo
            .delete(id)
            .await
            .context("Failed to delete user")?;

        tracing::info!(user_id = id, "Deleted user");
        Ok(())
    }
}
