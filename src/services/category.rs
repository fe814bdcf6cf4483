//! Category service
//!
//! Cached category listing plus the create/delete operations used for
//! seeding. Deleting a category leaves its recipes uncategorized.

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::CategoryRepository;
use crate::models::Category;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Maximum category name length, matching the column
const CATEGORY_NAME_MAX_LENGTH: usize = 65;

const CACHE_KEY_CATEGORY_LIST: &str = "categories:list";
const CACHE_KEY_CATEGORY_BY_ID: &str = "categories:id:";

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category not found
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>, cache: Arc<Cache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self { repo, cache, cache_ttl }
    }

    /// Create a category
    ///
    /// # Errors
    /// - `ValidationError` if the name is blank or longer than 65 characters
    pub async fn create(&self, name: &str) -> Result<Category, CategoryServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category name cannot be empty".to_string(),
            ));
        }
        if name.chars().count() > CATEGORY_NAME_MAX_LENGTH {
            return Err(CategoryServiceError::ValidationError(format!(
                "Category name cannot exceed {} characters",
                CATEGORY_NAME_MAX_LENGTH
            )));
        }

        let created = self
            .repo
            .create(&Category::new(name.to_string()))
            .await
            .context("Failed to create category")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Get category by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Category>, CategoryServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_CATEGORY_BY_ID, id);
        if let Some(category) = self.cache.get::<Category>(&cache_key).await.ok().flatten() {
            return Ok(Some(category));
        }

        let category = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get category by ID")?;

        if let Some(ref cat) = category {
            let _ = self.cache.set(&cache_key, cat, self.cache_ttl).await;
        }
        Ok(category)
    }

    /// List all categories ordered by name
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        if let Some(list) = self
            .cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list categories")?;

        let _ = self.cache.set(CACHE_KEY_CATEGORY_LIST, &list, self.cache_ttl).await;
        Ok(list)
    }

    /// Delete a category
    ///
    /// # Errors
    /// - `NotFound` if the category doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), CategoryServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get category")?
            .ok_or_else(|| CategoryServiceError::NotFound(format!("Category with ID {} not found", id)))?;

        self.repo.delete(id).await.context("Failed to delete category")?;

        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_CATEGORY_LIST).await;
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_CATEGORY_BY_ID))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<Cache>, CategoryService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = Arc::new(MemoryCache::new());
        let service = CategoryService::new(SqlxCategoryRepository::boxed(pool), cache.clone());
        (cache, service)
    }

    #[tokio::test]
    async fn test_create_and_list_sorted() {
        let (_, service) = setup_test_service().await;

        service.create("Soups").await.unwrap();
        service.create("Desserts").await.unwrap();

        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Desserts", "Soups"]);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (_, service) = setup_test_service().await;

        assert!(matches!(
            service.create("").await,
            Err(CategoryServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create(&"c".repeat(CATEGORY_NAME_MAX_LENGTH + 1)).await,
            Err(CategoryServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_write() {
        let (cache, service) = setup_test_service().await;
        let soups = service.create("Soups").await.unwrap();

        assert_eq!(service.list().await.unwrap().len(), 1);
        assert_eq!(service.get_by_id(soups.id).await.unwrap(), Some(soups.clone()));
        assert!(cache
            .get::<Vec<Category>>(CACHE_KEY_CATEGORY_LIST)
            .await
            .unwrap()
            .is_some());

        service.delete(soups.id).await.unwrap();
        assert!(service.list().await.unwrap().is_empty());
        assert_eq!(service.get_by_id(soups.id).await.unwrap(), None);
        assert!(matches!(
            service.delete(soups.id).await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }
}
