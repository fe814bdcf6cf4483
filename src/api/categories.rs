//! Category API endpoints
//!
//! - GET /recipes-api/categories/ - All categories, ordered by name

use axum::{extract::State, routing::get, Json, Router};

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::CategoryResponse;
use crate::services::CategoryServiceError;

impl From<CategoryServiceError> for ApiError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => ApiError::not_found("No Category matches the given query."),
            CategoryServiceError::ValidationError(message) => ApiError::bad_request(message),
            CategoryServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Build the categories router
pub fn router() -> Router<AppState> {
    Router::new().route("/recipes-api/categories/", get(list_categories))
}

/// GET /recipes-api/categories/
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let categories = state.category_service.list().await?;
    Ok(Json(categories.into_iter().map(CategoryResponse::from).collect()))
}
