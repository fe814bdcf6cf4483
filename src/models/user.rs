//! User model
//!
//! Users are the authors of recipes and the identities behind JWT tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Inactive users cannot obtain tokens
    pub is_active: bool,
    /// Staff may publish recipes and manage categories, tags and accounts
    #[serde(default)]
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user.
    ///
    /// The password must already be hashed with `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
        }
    }
}

/// Input for registering a user (before password hashing)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    pub username: String,
    /// Plaintext password (will be hashed)
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl CreateUserInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    /// Set the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new_is_active() {
        let user = User::new("cook".to_string(), "cook@example.com".to_string(), "hash".to_string());

        assert_eq!(user.id, 0);
        assert_eq!(user.username, "cook");
        assert!(user.is_active);
        assert!(user.first_name.is_empty());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("cook".to_string(), String::new(), "secret-hash".to_string());
        let json = serde_json::to_string(&user).unwrap();

        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
