//! Services layer - Business logic
//!
//! Services sit between the HTTP handlers and the repositories:
//! - Validating input and enforcing business rules
//! - Coordinating repositories and the cache
//! - Mapping failures onto per-service error enums

pub mod category;
pub mod password;
pub mod rate_limiter;
pub mod recipe;
pub mod recipe_validator;
pub mod tag;
pub mod token;
pub mod user;
pub mod validation;

pub use category::{CategoryService, CategoryServiceError};
pub use password::{hash_password, verify_password};
pub use rate_limiter::LoginRateLimiter;
pub use recipe::{generate_slug, RecipeService, RecipeServiceError};
pub use tag::{TagService, TagServiceError};
pub use token::{extract_bearer, Claims, TokenError, TokenPair, TokenService, TokenType};
pub use user::{UserService, UserServiceError};
pub use validation::FieldErrors;
