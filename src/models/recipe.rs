//! Recipe model
//!
//! This module provides:
//! - `Recipe`, the stored row
//! - `RecipeWithRelations`, a recipe joined with its category, author and tags
//! - Input types for creating and updating recipes
//! - `RecipeFilter` for the public queryset
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Tag;

/// Recipe entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    /// Unique identifier
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL-friendly slug, derived from the title on creation
    pub slug: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    /// Path of the cover image, empty when there is none
    pub cover: String,
    /// Only published recipes are visible through the public API
    pub is_published: bool,
    pub category_id: Option<i64>,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recipe {
    /// "<preparation_time> <preparation_time_unit>", e.g. "10 Minutes"
    pub fn preparation(&self) -> String {
        format!("{} {}", self.preparation_time, self.preparation_time_unit)
    }

    /// Copy every field set in `input` onto this recipe. Tags live elsewhere.
    pub fn apply_update(&mut self, input: &UpdateRecipeInput) {
        if let Some(title) = &input.title {
            self.title = title.clone();
        }
        if let Some(description) = &input.description {
            self.description = description.clone();
        }
        if let Some(time) = input.preparation_time {
            self.preparation_time = time;
        }
        if let Some(unit) = &input.preparation_time_unit {
            self.preparation_time_unit = unit.clone();
        }
        if let Some(servings) = input.servings {
            self.servings = servings;
        }
        if let Some(unit) = &input.servings_unit {
            self.servings_unit = unit.clone();
        }
        if let Some(steps) = &input.preparation_steps {
            self.preparation_steps = steps.clone();
        }
        if let Some(is_html) = input.preparation_steps_is_html {
            self.preparation_steps_is_html = is_html;
        }
        if let Some(cover) = &input.cover {
            self.cover = cover.clone();
        }
        if let Some(category_id) = input.category_id {
            self.category_id = category_id;
        }
        if let Some(is_published) = input.is_published {
            self.is_published = is_published;
        }
    }
}

/// A recipe together with everything its representation needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWithRelations {
    #[serde(flatten)]
    pub recipe: Recipe,
    /// Name of the category, if any
    pub category_name: Option<String>,
    /// Username of the author
    pub author_username: String,
    /// Tags ordered by id
    pub tags: Vec<Tag>,
}

/// Input for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRecipeInput {
    pub title: String,
    pub description: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    #[serde(default)]
    pub preparation_steps_is_html: bool,
    #[serde(default)]
    pub cover: String,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    /// Author user ID
    pub author_id: i64,
    /// Defaults to false: new recipes wait for review
    #[serde(default)]
    pub is_published: bool,
}

impl CreateRecipeInput {
    /// Create an input with the required fields; everything else takes its default
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        preparation_time: i64,
        preparation_time_unit: impl Into<String>,
        servings: i64,
        servings_unit: impl Into<String>,
        preparation_steps: impl Into<String>,
        author_id: i64,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            preparation_time,
            preparation_time_unit: preparation_time_unit.into(),
            servings,
            servings_unit: servings_unit.into(),
            preparation_steps: preparation_steps.into(),
            preparation_steps_is_html: false,
            cover: String::new(),
            category_id: None,
            tag_ids: Vec::new(),
            author_id,
            is_published: false,
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = tag_ids;
        self
    }

    pub fn published(mut self) -> Self {
        self.is_published = true;
        self
    }
}

/// Input for updating an existing recipe. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateRecipeInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preparation_time: Option<i64>,
    pub preparation_time_unit: Option<String>,
    pub servings: Option<i64>,
    pub servings_unit: Option<String>,
    pub preparation_steps: Option<String>,
    pub preparation_steps_is_html: Option<bool>,
    pub cover: Option<String>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<i64>>,
    /// Replaces the whole tag set
    pub tag_ids: Option<Vec<i64>>,
    pub is_published: Option<bool>,
}

impl UpdateRecipeInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags(mut self, tag_ids: Vec<i64>) -> Self {
        self.tag_ids = Some(tag_ids);
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.preparation_time.is_some()
            || self.preparation_time_unit.is_some()
            || self.servings.is_some()
            || self.servings_unit.is_some()
            || self.preparation_steps.is_some()
            || self.preparation_steps_is_html.is_some()
            || self.cover.is_some()
            || self.category_id.is_some()
            || self.tag_ids.is_some()
            || self.is_published.is_some()
    }
}

/// Filters applied on top of the published-recipes queryset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub category_id: Option<i64>,
}

impl RecipeFilter {
    /// Build a filter from the raw `category_id` query value.
    ///
    /// The value only counts when it is non-empty and made of ASCII digits.
    /// Anything else (including a number too large for i64) means "no filter".
    pub fn from_query(category_id: Option<&str>) -> Self {
        let category_id = category_id
            .filter(|raw| !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|raw| raw.parse::<i64>().ok());
        Self { category_id }
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 6,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Number of pages needed for `total` items. An empty result still has one page.
pub fn page_count(total: i64, per_page: u32) -> u32 {
    if per_page == 0 || total <= 0 {
        return 1;
    }
    let per_page = per_page as i64;
    ((total + per_page - 1) / per_page).min(u32::MAX as i64) as u32
}

/// The `page` query parameter before it is checked against the row count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(u32),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl PageRequest {
    /// Parse the raw value. `None` when it is neither a number nor `last`.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw {
            None | Some("") => Some(Self::default()),
            Some("last") => Some(Self::Last),
            Some(raw) => raw.parse::<u32>().ok().map(Self::Number),
        }
    }

    /// Resolve to a concrete page number, or `None` when it is out of range.
    pub fn resolve(self, total: i64, per_page: u32) -> Option<u32> {
        let pages = page_count(total, per_page);
        match self {
            Self::Last => Some(pages),
            Self::Number(n) if n >= 1 && n <= pages => Some(n),
            Self::Number(_) => None,
        }
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        page_count(self.total, self.per_page)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_recipe() -> Recipe {
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
            preparation_steps: "Mix and fry".to_string(),
            preparation_steps_is_html: false,
            cover: String::new(),
            is_published: true,
            category_id: None,
            author_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_preparation_joins_time_and_unit() {
        assert_eq!(sample_recipe().preparation(), "10 Minutes");
    }

    #[test]
    fn test_apply_update_only_touches_set_fields() {
        let mut recipe = sample_recipe();
        recipe.category_id = Some(4);

        recipe.apply_update(&UpdateRecipeInput {
            title: Some("Crepes".to_string()),
            servings: Some(2),
            category_id: Some(None),
            ..Default::default()
        });

        assert_eq!(recipe.title, "Crepes");
        assert_eq!(recipe.servings, 2);
        assert_eq!(recipe.category_id, None);
        assert_eq!(recipe.description, "Fluffy");
        assert_eq!(recipe.slug, "pancakes");
        assert_eq!(recipe.preparation_time, 10);
    }

    #[test]
    fn test_create_input_defaults_unpublished() {
        let input = CreateRecipeInput::new("Pancakes", "Fluffy", 10, "Minutes", 4, "Portions", "Mix", 1);
        assert!(!input.is_published);
        assert!(input.tag_ids.is_empty());
        assert!(input.category_id.is_none());
        assert!(input.published().is_published);
    }

    #[test]
    fn test_update_input_has_changes() {
        assert!(!UpdateRecipeInput::new().has_changes());
        assert!(UpdateRecipeInput::new().with_title("Waffles").has_changes());
        assert!(UpdateRecipeInput::new().with_tags(vec![]).has_changes());

        let clear_category = UpdateRecipeInput {
            category_id: Some(None),
            ..Default::default()
        };
        assert!(clear_category.has_changes());
    }

    #[test]
    fn test_filter_from_query() {
        assert_eq!(RecipeFilter::from_query(Some("3")).category_id, Some(3));
        assert_eq!(RecipeFilter::from_query(Some("")).category_id, None);
        assert_eq!(RecipeFilter::from_query(Some("abc")).category_id, None);
        assert_eq!(RecipeFilter::from_query(Some("-1")).category_id, None);
        assert_eq!(RecipeFilter::from_query(Some("1.5")).category_id, None);
        assert_eq!(RecipeFilter::from_query(None).category_id, None);
        assert_eq!(
            RecipeFilter::from_query(Some("99999999999999999999999")).category_id,
            None
        );
    }

    #[test]
    fn test_list_params_offset() {
        let params = ListParams::new(3, 6);
        assert_eq!(params.offset(), 12);
        assert_eq!(params.limit(), 6);

        let clamped = ListParams::new(0, 0);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 1);
    }

    #[test]
    fn test_page_request_parse() {
        assert_eq!(PageRequest::parse(None), Some(PageRequest::Number(1)));
        assert_eq!(PageRequest::parse(Some("2")), Some(PageRequest::Number(2)));
        assert_eq!(PageRequest::parse(Some("last")), Some(PageRequest::Last));
        assert_eq!(PageRequest::parse(Some("two")), None);
        assert_eq!(PageRequest::parse(Some("-1")), None);
    }

    #[test]
    fn test_page_request_resolve() {
        assert_eq!(PageRequest::Number(1).resolve(0, 6), Some(1));
        assert_eq!(PageRequest::Number(2).resolve(0, 6), None);
        assert_eq!(PageRequest::Number(0).resolve(10, 6), None);
        assert_eq!(PageRequest::Number(2).resolve(7, 6), Some(2));
        assert_eq!(PageRequest::Number(3).resolve(12, 6), None);
        assert_eq!(PageRequest::Last.resolve(13, 6), Some(3));
        assert_eq!(PageRequest::Last.resolve(0, 6), Some(1));
    }

    #[test]
    fn test_paged_result_navigation() {
        let result = PagedResult::new(vec![1, 2, 3, 4, 5, 6], 13, &ListParams::new(2, 6));
        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_prev());

        let mapped = result.map(|n| n * 2);
        assert_eq!(mapped.items[0], 2);
        assert_eq!(mapped.total, 13);
    }

    proptest! {
        #[test]
        fn prop_page_count_covers_all_items(total in 0i64..100_000, per_page in 1u32..500) {
            let pages = page_count(total, per_page) as i64;
            prop_assert!(pages >= 1);
            prop_assert!(pages * per_page as i64 >= total);
            if total > 0 {
                prop_assert!((pages - 1) * (per_page as i64) < total);
            }
        }

        #[test]
        fn prop_numeric_category_filter_round_trips(id in 0i64..i64::MAX) {
            let raw = id.to_string();
            prop_assert_eq!(RecipeFilter::from_query(Some(&raw)).category_id, Some(id));
        }

        #[test]
        fn prop_non_digit_category_filter_ignored(raw in ".*[^0-9].*") {
            prop_assert_eq!(RecipeFilter::from_query(Some(&raw)).category_id, None);
        }
    }
}
