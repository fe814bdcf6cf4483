//! Category model

use serde::{Deserialize, Serialize};

/// Recipe category. Its display form is the name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

impl Category {
    /// The ID is assigned by the database.
    pub fn new(name: String) -> Self {
        Self { id: 0, name }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
