//! Tag service
//!
//! Tags are read-only over HTTP. This service serves the cached listing and
//! single-tag lookups, and is how tags get created or removed (seeding and
//! administration).

use crate::cache::{Cache, CacheLayer};
use crate::db::repositories::TagRepository;
use crate::models::Tag;
use crate::services::recipe::generate_slug;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

/// Maximum tag name length, matching the column
const TAG_NAME_MAX_LENGTH: usize = 255;

/// Cache keys
const CACHE_KEY_TAG_LIST: &str = "tags:list";
const CACHE_KEY_TAG_BY_ID: &str = "tags:id:";

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service
pub struct TagService {
    repo: Arc<dyn TagRepository>,
    cache: Arc<Cache>,
    cache_ttl: Duration,
}

impl TagService {
    pub fn new(repo: Arc<dyn TagRepository>, cache: Arc<Cache>) -> Self {
        let cache_ttl = cache.default_ttl();
        Self { repo, cache, cache_ttl }
    }

    /// Create a tag, or return the existing one with the same slug
    ///
    /// # Errors
    /// - `ValidationError` if the name is blank, too long or has no slug-able characters
    pub async fn create_or_get(&self, name: &str) -> Result<Tag, TagServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagServiceError::ValidationError("Tag name cannot be empty".to_string()));
        }
        if name.chars().count() > TAG_NAME_MAX_LENGTH {
            return Err(TagServiceError::ValidationError(format!(
                "Tag name cannot exceed {} characters",
                TAG_NAME_MAX_LENGTH
            )));
        }

        let slug = generate_slug(name);
        if slug.is_empty() {
            return Err(TagServiceError::ValidationError(format!(
                "Tag name '{}' does not produce a usable slug",
                name
            )));
        }

        if let Some(existing) = self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check existing tag")?
        {
            return Ok(existing);
        }

        let created = self
            .repo
            .create(&Tag::new(name.to_string(), slug))
            .await
            .context("Failed to create tag")?;

        self.invalidate_cache().await;
        Ok(created)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_TAG_BY_ID, id);
        if let Some(tag) = self.cache.get::<Tag>(&cache_key).await.ok().flatten() {
            return Ok(Some(tag));
        }

        let tag = self.repo.get_by_id(id).await.context("Failed to get tag by ID")?;

        if let Some(ref tag) = tag {
            let _ = self.cache.set(&cache_key, tag, self.cache_ttl).await;
        }
        Ok(tag)
    }

    /// List all tags ordered by name
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        if let Some(list) = self.cache.get::<Vec<Tag>>(CACHE_KEY_TAG_LIST).await.ok().flatten() {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list tags")?;

        let _ = self.cache.set(CACHE_KEY_TAG_LIST, &list, self.cache_ttl).await;
        Ok(list)
    }

    /// Delete a tag. Its recipe links are removed with it.
    ///
    /// # Errors
    /// - `NotFound` if the tag doesn't exist
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        let tag = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get tag")?
            .ok_or_else(|| TagServiceError::NotFound(format!("Tag with ID {} not found", id)))?;

        self.repo.delete(tag.id).await.context("Failed to delete tag")?;

        self.invalidate_cache().await;
        Ok(())
    }

    async fn invalidate_cache(&self) {
        let _ = self.cache.delete(CACHE_KEY_TAG_LIST).await;
        let _ = self
            .cache
            .delete_pattern(&format!("{}*", CACHE_KEY_TAG_BY_ID))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::db::repositories::SqlxTagRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> (Arc<dyn TagRepository>, Arc<Cache>, TagService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let repo = SqlxTagRepository::boxed(pool);
        let cache = Arc::new(MemoryCache::new());
        let service = TagService::new(repo.clone(), cache.clone());
        (repo, cache, service)
    }

    #[tokio::test]
    async fn test_create_or_get_reuses_slug() {
        let (_, _, service) = setup_test_service().await;

        let first = service.create_or_get("Quick Meals").await.unwrap();
        assert_eq!(first.slug, "quick-meals");

        let again = service.create_or_get("  quick meals ").await.unwrap();
        assert_eq!(again.id, first.id);
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_or_get_validation() {
        let (_, _, service) = setup_test_service().await;

        assert!(matches!(
            service.create_or_get("   ").await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create_or_get("???").await,
            Err(TagServiceError::ValidationError(_))
        ));
        assert!(matches!(
            service.create_or_get(&"t".repeat(TAG_NAME_MAX_LENGTH + 1)).await,
            Err(TagServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_is_cached_and_invalidated() {
        let (repo, cache, service) = setup_test_service().await;
        service.create_or_get("Vegan").await.unwrap();

        assert_eq!(service.list().await.unwrap().len(), 1);
        assert!(cache.get::<Vec<Tag>>(CACHE_KEY_TAG_LIST).await.unwrap().is_some());

        // Written behind the service's back: the cached list is still served
        repo.create(&Tag::new("Raw".to_string(), "raw".to_string())).await.unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        // A write through the service drops the cache
        service.create_or_get("Spicy").await.unwrap();
        let names: Vec<String> = service.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Raw", "Spicy", "Vegan"]);
    }

    #[tokio::test]
    async fn test_get_by_id_and_delete() {
        let (_, cache, service) = setup_test_service().await;
        let tag = service.create_or_get("Vegan").await.unwrap();

        assert_eq!(service.get_by_id(tag.id).await.unwrap(), Some(tag.clone()));
        let cache_key = format!("{}{}", CACHE_KEY_TAG_BY_ID, tag.id);
        assert!(cache.get::<Tag>(&cache_key).await.unwrap().is_some());

        service.delete(tag.id).await.unwrap();
        assert!(cache.get::<Tag>(&cache_key).await.unwrap().is_none());
        assert_eq!(service.get_by_id(tag.id).await.unwrap(), None);

        assert!(matches!(service.delete(tag.id).await, Err(TagServiceError::NotFound(_))));
    }
}
