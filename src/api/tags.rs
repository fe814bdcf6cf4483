//! Tag API endpoints
//!
//! Read-only:
//! - GET /recipes-api/tags/       - All tags, ordered by name
//! - GET /recipes-api/tags/{id}/  - One tag

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::common::parse_id;
use crate::api::middleware::{ApiError, AppState};
use crate::models::Tag;
use crate::services::TagServiceError;

impl From<TagServiceError> for ApiError {
    fn from(e: TagServiceError) -> Self {
        match e {
            TagServiceError::NotFound(_) => ApiError::not_found("No Tag matches the given query."),
            TagServiceError::ValidationError(message) => ApiError::bad_request(message),
            TagServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recipes-api/tags/", get(list_tags))
        .route("/recipes-api/tags/{id}/", get(get_tag))
}

/// GET /recipes-api/tags/
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.tag_service.list().await?))
}

/// GET /recipes-api/tags/{id}/
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    let id = parse_id(&id)?;
    state
        .tag_service
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No Tag matches the given query."))
}
