//! Database repositories
//!
//! One repository per entity. Each is an `async_trait` trait plus an sqlx
//! implementation that dispatches on the configured driver.

pub mod category;
pub mod recipe;
pub mod tag;
pub mod user;

pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// `?, ?, ?` for an IN clause with `count` values
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::placeholders;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }
}
