//! Shared API response types
//!
//! Wire representations of the models. Links are absolute, built from the
//! request's `BaseUrl`.

use serde::{Deserialize, Serialize};

use crate::api::common::BaseUrl;
use crate::models::{Category, RecipeWithRelations, Tag, User};

/// Path of the tag detail endpoint
pub fn tag_detail_path(id: i64) -> String {
    format!("/recipes-api/tags/{}/", id)
}

/// Path of the recipe detail endpoint
pub fn recipe_detail_path(id: i64) -> String {
    format!("/recipes-api/{}/", id)
}

/// Recipe representation
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub slug: String,
    /// "<preparation_time> <preparation_time_unit>"
    pub preparation: String,
    pub preparation_time: i64,
    pub preparation_time_unit: String,
    pub servings: i64,
    pub servings_unit: String,
    pub preparation_steps: String,
    pub preparation_steps_is_html: bool,
    pub cover: String,
    pub public: bool,
    /// Category name
    pub category: Option<String>,
    /// Author username
    pub author: String,
    /// Tag ids
    pub tags: Vec<i64>,
    pub tag_objects: Vec<Tag>,
    pub tag_link: Vec<String>,
    pub created_at: String,
}

impl RecipeResponse {
    pub fn new(item: RecipeWithRelations, base: &BaseUrl) -> Self {
        let recipe = item.recipe;
        Self {
            preparation: recipe.preparation(),
            id: recipe.id,
            title: recipe.title,
            description: recipe.description,
            slug: recipe.slug,
            preparation_time: recipe.preparation_time,
            preparation_time_unit: recipe.preparation_time_unit,
            servings: recipe.servings,
            servings_unit: recipe.servings_unit,
            preparation_steps: recipe.preparation_steps,
            preparation_steps_is_html: recipe.preparation_steps_is_html,
            cover: recipe.cover,
            public: recipe.is_published,
            category: item.category_name,
            author: item.author_username,
            tags: item.tags.iter().map(|tag| tag.id).collect(),
            tag_link: item
                .tags
                .iter()
                .map(|tag| base.absolute(&tag_detail_path(tag.id)))
                .collect(),
            tag_objects: item.tags,
            created_at: recipe.created_at.to_rfc3339(),
        }
    }
}

/// Page of results with absolute links to its neighbours
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Category representation
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

/// Public view of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for AuthorResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipe;
    use chrono::Utc;

    #[test]
    fn test_recipe_response_fields() {
        let now = Utc::now();
        let item = RecipeWithRelations {
            recipe: Recipe {
                id: 5,
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
                category_id: Some(2),
                author_id: 1,
                created_at: now,
                updated_at: now,
            },
            category_name: Some("Breakfast".to_string()),
            author_username: "cook".to_string(),
            tags: vec![Tag {
                id: 3,
                name: "Quick".to_string(),
                slug: "quick".to_string(),
            }],
        };

        let response = RecipeResponse::new(item, &BaseUrl::new("http", "testserver"));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["preparation"], "10 Minutes");
        assert_eq!(json["category"], "Breakfast");
        assert_eq!(json["author"], "cook");
        assert_eq!(json["public"], true);
        assert_eq!(json["tags"], serde_json::json!([3]));
        assert_eq!(json["tag_objects"][0]["slug"], "quick");
        assert_eq!(json["tag_link"][0], "http://testserver/recipes-api/tags/3/");
        assert!(json.get("author_id").is_none());
        assert!(json.get("is_published").is_none());
    }
}
