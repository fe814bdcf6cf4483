//! Recipe service
//!
//! Business logic behind the recipe API:
//! - The published-recipes queryset with the category filter and pagination
//! - Creation from a validated payload, with slug generation
//! - Partial updates validated against the stored recipe
//! - Deletion and publication

use crate::db::repositories::{CategoryRepository, RecipeRepository, TagRepository};
use crate::models::{
    CreateRecipeInput, ListParams, PageRequest, PagedResult, Recipe, RecipeFilter,
    RecipeWithRelations,
};
use crate::services::recipe_validator::{author_rule_errors, reference_errors, Mode, RecipePayload};
use crate::services::FieldErrors;
use anyhow::Context;
use serde_json::Value;
use std::sync::Arc;

/// Maximum slug length, matching the column
pub const SLUG_MAX_LENGTH: usize = 65;

/// Default number of recipes per page
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Inserts tried before a slug conflict is reported as an error
const SLUG_ATTEMPTS: usize = 5;

/// Error types for recipe service operations
#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    /// Recipe not found (or not visible)
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// The requested page does not exist
    #[error("Invalid page.")]
    InvalidPage,

    /// Field-level validation failures
    #[error("Validation error")]
    ValidationError(FieldErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Recipe service
pub struct RecipeService {
    recipes: Arc<dyn RecipeRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    page_size: u32,
}

impl RecipeService {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
    ) -> Self {
        Self::with_page_size(recipes, categories, tags, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(
        recipes: Arc<dyn RecipeRepository>,
        categories: Arc<dyn CategoryRepository>,
        tags: Arc<dyn TagRepository>,
        page_size: u32,
    ) -> Self {
        Self {
            recipes,
            categories,
            tags,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// One page of published recipes matching `filter`
    ///
    /// # Errors
    ///
    /// - `InvalidPage` when the page lies beyond the last page
    pub async fn list_published(
        &self,
        filter: &RecipeFilter,
        page: PageRequest,
    ) -> Result<PagedResult<RecipeWithRelations>, RecipeServiceError> {
        let total = self
            .recipes
            .count_published(filter)
            .await
            .context("Failed to count recipes")?;

        let page = page
            .resolve(total, self.page_size)
            .ok_or(RecipeServiceError::InvalidPage)?;
        let params = ListParams::new(page, self.page_size);

        let items = self
            .recipes
            .list_published(filter, &params)
            .await
            .context("Failed to list recipes")?;

        Ok(PagedResult::new(items, total, &params))
    }

    /// A published recipe inside the filtered queryset
    pub async fn get_published(
        &self,
        id: i64,
        filter: &RecipeFilter,
    ) -> Result<RecipeWithRelations, RecipeServiceError> {
        self.recipes
            .get_published(id, filter)
            .await
            .context("Failed to get recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe with ID {} not found", id)))
    }

    /// Validate a request body and create the recipe for `author_id`
    ///
    /// Any `author` key in the body is ignored.
    pub async fn create(&self, body: &Value, author_id: i64) -> Result<RecipeWithRelations, RecipeServiceError> {
        let payload = self.validate(body, Mode::Create, None).await?;
        let recipe = self.create_recipe(payload.into_create_input(author_id)).await?;
        self.load(recipe.id).await
    }

    /// Create a recipe from typed input, generating a unique slug from the title
    ///
    /// A slug taken between the existence check and the insert is skipped and
    /// the next candidate tried, up to `SLUG_ATTEMPTS` times.
    pub async fn create_recipe(&self, input: CreateRecipeInput) -> Result<Recipe, RecipeServiceError> {
        let mut taken = Vec::new();
        loop {
            let slug = self.unique_slug(&input.title, &taken).await?;
            match self.recipes.create(&input, &slug).await {
                Ok(recipe) => {
                    tracing::info!(recipe_id = recipe.id, author_id = recipe.author_id, slug = %recipe.slug, "Created recipe");
                    return Ok(recipe);
                }
                Err(e) if is_slug_conflict(&e) && taken.len() + 1 < SLUG_ATTEMPTS => {
                    tracing::debug!(slug = %slug, "Slug taken concurrently, retrying");
                    taken.push(slug);
                }
                Err(e) => return Err(e.context("Failed to create recipe").into()),
            }
        }
    }

    /// Validate a partial body against `recipe` and save it
    pub async fn partial_update(
        &self,
        recipe: &Recipe,
        body: &Value,
    ) -> Result<RecipeWithRelations, RecipeServiceError> {
        let payload = self.validate(body, Mode::Partial, Some(recipe)).await?;

        self.recipes
            .update(recipe.id, &payload.into_update_input())
            .await
            .context("Failed to update recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe with ID {} not found", recipe.id)))?;

        tracing::info!(recipe_id = recipe.id, "Updated recipe");
        self.load(recipe.id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), RecipeServiceError> {
        self.recipes
            .delete(id)
            .await
            .context("Failed to delete recipe")?;

        tracing::info!(recipe_id = id, "Deleted recipe");
        Ok(())
    }

    /// Publish or unpublish a recipe
    pub async fn set_published(&self, id: i64, published: bool) -> Result<RecipeWithRelations, RecipeServiceError> {
        let input = crate::models::UpdateRecipeInput {
            is_published: Some(published),
            ..Default::default()
        };

        self.recipes
            .update(id, &input)
            .await
            .context("Failed to update recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe with ID {} not found", id)))?;

        tracing::info!(recipe_id = id, published, "Changed publication state");
        self.load(id).await
    }

    async fn load(&self, id: i64) -> Result<RecipeWithRelations, RecipeServiceError> {
        self.recipes
            .get_with_relations(id)
            .await
            .context("Failed to load recipe")?
            .ok_or_else(|| RecipeServiceError::NotFound(format!("Recipe with ID {} not found", id)))
    }

    /// Parse the body, check the referenced rows, then apply the author rules
    async fn validate(
        &self,
        body: &Value,
        mode: Mode,
        instance: Option<&Recipe>,
    ) -> Result<RecipePayload, RecipeServiceError> {
        let payload = RecipePayload::parse(body, mode).map_err(RecipeServiceError::ValidationError)?;

        let category_exists = match payload.category_id() {
            Some(id) => self
                .categories
                .get_by_id(id)
                .await
                .context("Failed to check category")?
                .is_some(),
            None => true,
        };
        let existing_tags = if payload.tag_ids().is_empty() {
            Vec::new()
        } else {
            self.tags
                .existing_ids(payload.tag_ids())
                .await
                .context("Failed to check tags")?
        };

        reference_errors(&payload, category_exists, &existing_tags)
            .into_result()
            .map_err(RecipeServiceError::ValidationError)?;
        author_rule_errors(&payload, instance)
            .into_result()
            .map_err(RecipeServiceError::ValidationError)?;

        Ok(payload)
    }

    /// `base`, `base-2`, `base-3`, ... whichever is free first. Slugs in
    /// `taken` count as used.
    async fn unique_slug(&self, title: &str, taken: &[String]) -> Result<String, RecipeServiceError> {
        let base = match generate_slug(title) {
            slug if slug.is_empty() => "recipe".to_string(),
            slug => slug,
        };

        let mut candidate = base.clone();
        let mut counter = 2u32;
        while taken.contains(&candidate)
            || self
                .recipes
                .slug_exists(&candidate)
                .await
                .context("Failed to check slug")?
        {
            let suffix = format!("-{}", counter);
            let keep = SLUG_MAX_LENGTH.saturating_sub(suffix.len());
            candidate = format!("{}{}", truncate_slug(&base, keep), suffix);
            counter += 1;
        }
        Ok(candidate)
    }
}

/// True when an insert failed on the unique slug constraint
fn is_slug_conflict(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| match cause.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => db.is_unique_violation() && db.message().contains("slug"),
        _ => false,
    })
}

/// Generate a URL-friendly slug from a recipe title
///
/// Lowercases the title, turns every run of characters other than ASCII
/// letters and digits into a single hyphen and trims hyphens from both ends.
/// The result is at most `SLUG_MAX_LENGTH` characters.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut prev_hyphen = true;

    for c in title.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }

    truncate_slug(slug.trim_end_matches('-'), SLUG_MAX_LENGTH)
}

fn truncate_slug(slug: &str, max: usize) -> String {
    // slugs are ASCII, so byte and char lengths agree
    let cut = &slug[..slug.len().min(max)];
    cut.trim_end_matches('-').to_string()
}
