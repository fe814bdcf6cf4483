//! Object-level permissions

use crate::api::middleware::ApiError;
use crate::models::{Recipe, User};

/// Only the author of a recipe may change or delete it.
///
/// Anonymous callers get 401; any other user gets 403.
pub struct IsOwner;

impl IsOwner {
    pub fn check(user: Option<&User>, recipe: &Recipe) -> Result<(), ApiError> {
        let user = user.ok_or_else(ApiError::not_authenticated)?;
        if user.id != recipe.author_id {
            return Err(ApiError::forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn recipe_by(author_id: i64) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: 1,
            title: "Pancakes".to_string(),
            description: "Fluffy".to_string(),
            slug: "pancakes".to_string(),
            preparation_time: 10,
            preparation_time_unit: "Minutes".to_string(),
            servings: 4,
            servings_unit: "Portions".to_string(),
            preparation_steps: "Mix".to_string(),
            preparation_steps_is_html: false,
            cover: String::new(),
            is_published: true,
            category_id: None,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(id: i64) -> User {
        let mut user = User::new(format!("user{}", id), String::new(), "hash".to_string());
        user.id = id;
        user
    }

    #[test]
    fn test_owner_allowed() {
        assert!(IsOwner::check(Some(&user(1)), &recipe_by(1)).is_ok());
    }

    #[test]
    fn test_other_user_forbidden() {
        let err = IsOwner::check(Some(&user(2)), &recipe_by(1)).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_anonymous_unauthorized() {
        let err = IsOwner::check(None, &recipe_by(1)).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
