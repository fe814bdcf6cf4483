//! Tag model

use serde::{Deserialize, Serialize};

/// Tag attached to recipes through the `recipe_tags` join table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    pub name: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

impl Tag {
    /// Create a new Tag. The ID is assigned by the database.
    pub fn new(name: String, slug: String) -> Self {
        Self { id: 0, name, slug }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_serializes_id_name_slug() {
        let mut tag = Tag::new("Vegan".to_string(), "vegan".to_string());
        tag.id = 3;

        let json = serde_json::to_value(&tag).unwrap();
        assert_eq!(json, serde_json::json!({"id": 3, "name": "Vegan", "slug": "vegan"}));
    }
}
