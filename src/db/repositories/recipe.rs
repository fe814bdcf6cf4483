//! Recipe repository
//!
//! Database operations for recipes and their tag links.
//!
//! The published-recipes queries (`list_published`, `count_published`,
//! `get_published`) are the base queryset of the public API. Writes run in a
//! transaction covering the recipe row and its `recipe_tags` rows.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    CreateRecipeInput, ListParams, Recipe, RecipeFilter, RecipeWithRelations, Tag,
    UpdateRecipeInput,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

use super::placeholders;
use super::tag::{row_to_tag_mysql, row_to_tag_sqlite};

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Insert a recipe and link its tags
    async fn create(&self, input: &CreateRecipeInput, slug: &str) -> Result<Recipe>;

    /// Get a recipe by ID regardless of publication state
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// Get a recipe with category, author and tags regardless of publication state
    async fn get_with_relations(&self, id: i64) -> Result<Option<RecipeWithRelations>>;

    /// Get a published recipe that also matches `filter`
    async fn get_published(&self, id: i64, filter: &RecipeFilter) -> Result<Option<RecipeWithRelations>>;

    /// One page of published recipes, newest first
    async fn list_published(
        &self,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<Vec<RecipeWithRelations>>;

    /// Number of published recipes matching `filter`
    async fn count_published(&self, filter: &RecipeFilter) -> Result<i64>;

    /// Apply a partial update. `None` when the recipe does not exist.
    async fn update(&self, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>>;

    /// Delete a recipe and its tag links
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check whether a slug is taken
    async fn slug_exists(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based recipe repository implementation
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

const RECIPE_COLUMNS: &str = r#"
    r.id, r.title, r.description, r.slug, r.preparation_time, r.preparation_time_unit,
    r.servings, r.servings_unit, r.preparation_steps, r.preparation_steps_is_html,
    r.cover, r.is_published, r.category_id, r.author_id, r.created_at, r.updated_at
"#;

fn select_with_relations() -> String {
    format!(
        r#"
        SELECT {}, c.name AS category_name, u.username AS author_username
        FROM recipes r
        LEFT JOIN categories c ON c.id = r.category_id
        INNER JOIN users u ON u.id = r.author_id
        "#,
        RECIPE_COLUMNS
    )
}

/// WHERE clause of the published queryset. Binds: is_published, then category_id if set.
fn published_where(filter: &RecipeFilter) -> &'static str {
    if filter.category_id.is_some() {
        "WHERE r.is_published = ? AND r.category_id = ?"
    } else {
        "WHERE r.is_published = ?"
    }
}

fn tags_for_recipes_sql(count: usize) -> String {
    format!(
        r#"
        SELECT rt.recipe_id, t.id, t.name, t.slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id IN ({})
        ORDER BY t.id
        "#,
        placeholders(count)
    )
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, input: &CreateRecipeInput, slug: &str) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_recipe_sqlite(self.pool.sqlite()?, input, slug).await,
            DatabaseDriver::Mysql => create_recipe_mysql(self.pool.mysql()?, input, slug).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
                    .context("Failed to get recipe by ID")?;
                row.as_ref().map(row_to_recipe_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.mysql()?)
                    .await
                    .context("Failed to get recipe by ID")?;
                row.as_ref().map(row_to_recipe_mysql).transpose()
            }
        }
    }

    async fn get_with_relations(&self, id: i64) -> Result<Option<RecipeWithRelations>> {
        let sql = format!("{} WHERE r.id = ?", select_with_relations());
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get recipe")?;
                let rows: Vec<_> = row.into_iter().collect();
                Ok(attach_tags_sqlite(pool, &rows).await?.pop())
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get recipe")?;
                let rows: Vec<_> = row.into_iter().collect();
                Ok(attach_tags_mysql(pool, &rows).await?.pop())
            }
        }
    }

    async fn get_published(&self, id: i64, filter: &RecipeFilter) -> Result<Option<RecipeWithRelations>> {
        let sql = format!(
            "{} {} AND r.id = ?",
            select_with_relations(),
            published_where(filter)
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let mut query = sqlx::query(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                let row = query
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get published recipe")?;
                let rows: Vec<_> = row.into_iter().collect();
                Ok(attach_tags_sqlite(pool, &rows).await?.pop())
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let mut query = sqlx::query(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                let row = query
                    .bind(id)
                    .fetch_optional(pool)
                    .await
                    .context("Failed to get published recipe")?;
                let rows: Vec<_> = row.into_iter().collect();
                Ok(attach_tags_mysql(pool, &rows).await?.pop())
            }
        }
    }

    async fn list_published(
        &self,
        filter: &RecipeFilter,
        params: &ListParams,
    ) -> Result<Vec<RecipeWithRelations>> {
        let sql = format!(
            "{} {} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?",
            select_with_relations(),
            published_where(filter)
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.sqlite()?;
                let mut query = sqlx::query(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list published recipes")?;
                attach_tags_sqlite(pool, &rows).await
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.mysql()?;
                let mut query = sqlx::query(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                let rows = query
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list published recipes")?;
                attach_tags_mysql(pool, &rows).await
            }
        }
    }

    async fn count_published(&self, filter: &RecipeFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM recipes r {}", published_where(filter));
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                query
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to count published recipes")
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(true);
                if let Some(category_id) = filter.category_id {
                    query = query.bind(category_id);
                }
                query
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to count published recipes")
            }
        }
    }

    async fn update(&self, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_recipe_sqlite(self.pool.sqlite()?, id, input).await,
            DatabaseDriver::Mysql => update_recipe_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut tx = self.pool.sqlite()?.begin().await?;
                sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete recipe tags")?;
                sqlx::query("DELETE FROM recipes WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete recipe")?;
                tx.commit().await?;
            }
            DatabaseDriver::Mysql => {
                let mut tx = self.pool.mysql()?.begin().await?;
                sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete recipe tags")?;
                sqlx::query("DELETE FROM recipes WHERE id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete recipe")?;
                tx.commit().await?;
            }
        }
        Ok(())
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM recipes WHERE slug = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query_scalar(sql)
                .bind(slug)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to check slug")?,
            DatabaseDriver::Mysql => sqlx::query_scalar(sql)
                .bind(slug)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to check slug")?,
        };
        Ok(count > 0)
    }
}

const INSERT_RECIPE_SQL: &str = r#"
    INSERT INTO recipes (
        title, description, slug, preparation_time, preparation_time_unit,
        servings, servings_unit, preparation_steps, preparation_steps_is_html,
        cover, is_published, category_id, author_id, created_at, updated_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_RECIPE_SQL: &str = r#"
    UPDATE recipes
    SET title = ?, description = ?, preparation_time = ?, preparation_time_unit = ?,
        servings = ?, servings_unit = ?, preparation_steps = ?, preparation_steps_is_html = ?,
        cover = ?, is_published = ?, category_id = ?, updated_at = ?
    WHERE id = ?
"#;

fn recipe_from_input(id: i64, input: &CreateRecipeInput, slug: &str) -> Recipe {
    let now = Utc::now();
    Recipe {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: slug.to_string(),
        preparation_time: input.preparation_time,
        preparation_time_unit: input.preparation_time_unit.clone(),
        servings: input.servings,
        servings_unit: input.servings_unit.clone(),
        preparation_steps: input.preparation_steps.clone(),
        preparation_steps_is_html: input.preparation_steps_is_html,
        cover: input.cover.clone(),
        is_published: input.is_published,
        category_id: input.category_id,
        author_id: input.author_id,
        created_at: now,
        updated_at: now,
    }
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, input: &CreateRecipeInput, slug: &str) -> Result<Recipe> {
    let mut recipe = recipe_from_input(0, input, slug);
    let mut tx = pool.begin().await?;

    let result = sqlx::query(INSERT_RECIPE_SQL)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.slug)
        .bind(recipe.preparation_time)
        .bind(&recipe.preparation_time_unit)
        .bind(recipe.servings)
        .bind(&recipe.servings_unit)
        .bind(&recipe.preparation_steps)
        .bind(recipe.preparation_steps_is_html)
        .bind(&recipe.cover)
        .bind(recipe.is_published)
        .bind(recipe.category_id)
        .bind(recipe.author_id)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create recipe")?;
    recipe.id = result.last_insert_rowid();

    for tag_id in dedup_ids(&input.tag_ids) {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link recipe tag")?;
    }

    tx.commit().await?;
    Ok(recipe)
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load recipe for update")?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut recipe = row_to_recipe_sqlite(&row)?;
    recipe.apply_update(input);
    recipe.updated_at = Utc::now();

    sqlx::query(UPDATE_RECIPE_SQL)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.preparation_time)
        .bind(&recipe.preparation_time_unit)
        .bind(recipe.servings)
        .bind(&recipe.servings_unit)
        .bind(&recipe.preparation_steps)
        .bind(recipe.preparation_steps_is_html)
        .bind(&recipe.cover)
        .bind(recipe.is_published)
        .bind(recipe.category_id)
        .bind(recipe.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    if let Some(tag_ids) = &input.tag_ids {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe tags")?;
        for tag_id in dedup_ids(tag_ids) {
            sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
                .bind(id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link recipe tag")?;
        }
    }

    tx.commit().await?;
    Ok(Some(recipe))
}

/// Turn joined recipe rows into `RecipeWithRelations`, loading all tags in one query
async fn attach_tags_sqlite(
    pool: &SqlitePool,
    rows: &[sqlx::sqlite::SqliteRow],
) -> Result<Vec<RecipeWithRelations>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut recipes = Vec::with_capacity(rows.len());
    for row in rows {
        recipes.push(RecipeWithRelations {
            recipe: row_to_recipe_sqlite(row)?,
            category_name: row.try_get("category_name")?,
            author_username: row.try_get("author_username")?,
            tags: Vec::new(),
        });
    }

    let sql = tags_for_recipes_sql(recipes.len());
    let mut query = sqlx::query(&sql);
    for item in &recipes {
        query = query.bind(item.recipe.id);
    }
    let tag_rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load recipe tags")?;

    let mut by_recipe: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in &tag_rows {
        let recipe_id: i64 = row.try_get("recipe_id")?;
        by_recipe.entry(recipe_id).or_default().push(row_to_tag_sqlite(row));
    }
    for item in &mut recipes {
        item.tags = by_recipe.remove(&item.recipe.id).unwrap_or_default();
    }

    Ok(recipes)
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        preparation_time: row.try_get("preparation_time")?,
        preparation_time_unit: row.try_get("preparation_time_unit")?,
        servings: row.try_get("servings")?,
        servings_unit: row.try_get("servings_unit")?,
        preparation_steps: row.try_get("preparation_steps")?,
        preparation_steps_is_html: row.try_get("preparation_steps_is_html")?,
        cover: row.try_get("cover")?,
        is_published: row.try_get("is_published")?,
        category_id: row.try_get("category_id")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, input: &CreateRecipeInput, slug: &str) -> Result<Recipe> {
    let mut recipe = recipe_from_input(0, input, slug);
    let mut tx = pool.begin().await?;

    let result = sqlx::query(INSERT_RECIPE_SQL)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.slug)
        .bind(recipe.preparation_time)
        .bind(&recipe.preparation_time_unit)
        .bind(recipe.servings)
        .bind(&recipe.servings_unit)
        .bind(&recipe.preparation_steps)
        .bind(recipe.preparation_steps_is_html)
        .bind(&recipe.cover)
        .bind(recipe.is_published)
        .bind(recipe.category_id)
        .bind(recipe.author_id)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&mut *tx)
        .await
        .context("Failed to create recipe")?;
    recipe.id = result.last_insert_id() as i64;

    for tag_id in dedup_ids(&input.tag_ids) {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe.id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to link recipe tag")?;
    }

    tx.commit().await?;
    Ok(recipe)
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, input: &UpdateRecipeInput) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {} FROM recipes r WHERE r.id = ? FOR UPDATE", RECIPE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to load recipe for update")?;
    let Some(row) = row else {
        return Ok(None);
    };

    let mut recipe = row_to_recipe_mysql(&row)?;
    recipe.apply_update(input);
    recipe.updated_at = Utc::now();

    sqlx::query(UPDATE_RECIPE_SQL)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.preparation_time)
        .bind(&recipe.preparation_time_unit)
        .bind(recipe.servings)
        .bind(&recipe.servings_unit)
        .bind(&recipe.preparation_steps)
        .bind(recipe.preparation_steps_is_html)
        .bind(&recipe.cover)
        .bind(recipe.is_published)
        .bind(recipe.category_id)
        .bind(recipe.updated_at)
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to update recipe")?;

    if let Some(tag_ids) = &input.tag_ids {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("Failed to clear recipe tags")?;
        for tag_id in dedup_ids(tag_ids) {
            sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
                .bind(id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .context("Failed to link recipe tag")?;
        }
    }

    tx.commit().await?;
    Ok(Some(recipe))
}

async fn attach_tags_mysql(
    pool: &MySqlPool,
    rows: &[sqlx::mysql::MySqlRow],
) -> Result<Vec<RecipeWithRelations>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut recipes = Vec::with_capacity(rows.len());
    for row in rows {
        recipes.push(RecipeWithRelations {
            recipe: row_to_recipe_mysql(row)?,
            category_name: row.try_get("category_name")?,
            author_username: row.try_get("author_username")?,
            tags: Vec::new(),
        });
    }

    let sql = tags_for_recipes_sql(recipes.len());
    let mut query = sqlx::query(&sql);
    for item in &recipes {
        query = query.bind(item.recipe.id);
    }
    let tag_rows = query
        .fetch_all(pool)
        .await
        .context("Failed to load recipe tags")?;

    let mut by_recipe: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in &tag_rows {
        let recipe_id: i64 = row.try_get("recipe_id")?;
        by_recipe.entry(recipe_id).or_default().push(row_to_tag_mysql(row));
    }
    for item in &mut recipes {
        item.tags = by_recipe.remove(&item.recipe.id).unwrap_or_default();
    }

    Ok(recipes)
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Recipe> {
    Ok(Recipe {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        slug: row.try_get("slug")?,
        preparation_time: row.try_get("preparation_time")?,
        preparation_time_unit: row.try_get("preparation_time_unit")?,
        servings: row.try_get("servings")?,
        servings_unit: row.try_get("servings_unit")?,
        preparation_steps: row.try_get("preparation_steps")?,
        preparation_steps_is_html: row.try_get("preparation_steps_is_html")?,
        cover: row.try_get("cover")?,
        is_published: row.try_get("is_published")?,
        category_id: row.try_get("category_id")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
