//! Data models
//!
//! Database entities (Recipe, Category, Tag, User), the inputs used to
//! create and update them, and the pagination types shared by list queries.

mod category;
mod recipe;
mod tag;
mod user;

pub use category::Category;
pub use recipe::{
    page_count, CreateRecipeInput, ListParams, PageRequest, PagedResult, Recipe, RecipeFilter,
    RecipeWithRelations, UpdateRecipeInput,
};
pub use tag::Tag;
pub use user::{CreateUserInput, User};
