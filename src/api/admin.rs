//! Staff API endpoints
//!
//! Moderation for staff accounts. Every route needs a staff bearer token.
//! - POST   /admin-api/recipes/{id}/publish/    - Make a recipe public
//! - POST   /admin-api/recipes/{id}/unpublish/  - Hide a recipe again
//! - POST   /admin-api/categories/              - Create a category
//! - DELETE /admin-api/categories/{id}/         - Delete a category
//! - POST   /admin-api/tags/                    - Create a tag, or reuse the one with the same slug
//! - DELETE /admin-api/tags/{id}/               - Delete a tag
//! - POST   /admin-api/users/{id}/activate/     - Re-enable an account
//! - POST   /admin-api/users/{id}/deactivate/   - Disable an account
//! - DELETE /admin-api/users/{id}/              - Delete an account and its recipes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{delete, post},
    Json, Router,
};

use crate::api::common::{parse_id, required_string, BaseUrl, RequestBody};
use crate::api::middleware::{require_staff, ApiError, AppState, CurrentUser};
use crate::api::responses::{AuthorResponse, CategoryResponse, RecipeResponse};
use crate::models::Tag;
use crate::services::{CategoryServiceError, FieldErrors, TagServiceError};

/// Build the staff router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin-api/recipes/{id}/publish/", post(publish_recipe))
        .route("/admin-api/recipes/{id}/unpublish/", post(unpublish_recipe))
        .route("/admin-api/categories/", post(create_category))
        .route("/admin-api/categories/{id}/", delete(delete_category))
        .route("/admin-api/tags/", post(create_tag))
        .route("/admin-api/tags/{id}/", delete(delete_tag))
        .route("/admin-api/users/{id}/activate/", post(activate_user))
        .route("/admin-api/users/{id}/deactivate/", post(deactivate_user))
        .route("/admin-api/users/{id}/", delete(delete_user))
        .route_layer(axum_middleware::from_fn(require_staff))
}

/// The `name` field of a create body
fn name_from(body: RequestBody) -> Result<String, ApiError> {
    let body = body.into_value()?;
    let mut errors = FieldErrors::new();
    required_string(&body, "name", &mut errors).ok_or_else(|| ApiError::validation(&errors))
}

fn name_error(message: String) -> ApiError {
    let mut errors = FieldErrors::new();
    errors.add("name", message);
    ApiError::validation(&errors)
}

async fn set_published(
    state: AppState,
    id: &str,
    base: &BaseUrl,
    published: bool,
) -> Result<Json<RecipeResponse>, ApiError> {
    let id = parse_id(id)?;
    let recipe = state.recipe_service.set_published(id, published).await?;
    Ok(Json(RecipeResponse::new(recipe, base)))
}

/// POST /admin-api/recipes/{id}/publish/
async fn publish_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    base: BaseUrl,
) -> Result<Json<RecipeResponse>, ApiError> {
    set_published(state, &id, &base, true).await
}

/// POST /admin-api/recipes/{id}/unpublish/
async fn unpublish_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    base: BaseUrl,
) -> Result<Json<RecipeResponse>, ApiError> {
    set_published(state, &id, &base, false).await
}

/// POST /admin-api/categories/
async fn create_category(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    let name = name_from(body)?;
    let category = match state.category_service.create(&name).await {
        Ok(category) => category,
        Err(CategoryServiceError::ValidationError(message)) => return Err(name_error(message)),
        Err(e) => return Err(e.into()),
    };
    Ok((StatusCode::CREATED, Json(category.into())))
}

/// DELETE /admin-api/categories/{id}/
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.category_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /admin-api/tags/
async fn create_tag(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let name = name_from(body)?;
    let tag = match state.tag_service.create_or_get(&name).await {
        Ok(tag) => tag,
        Err(TagServiceError::ValidationError(message)) => return Err(name_error(message)),
        Err(e) => return Err(e.into()),
    };
    Ok((StatusCode::CREATED, Json(tag)))
}

/// DELETE /admin-api/tags/{id}/
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Staff cannot lock themselves out
fn reject_self(current: &CurrentUser, id: i64) -> Result<(), ApiError> {
    if current.0.id == id {
        return Err(ApiError::bad_request("You cannot change your own account here."));
    }
    Ok(())
}

/// POST /admin-api/users/{id}/activate/
async fn activate_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let id = parse_id(&id)?;
    let user = state.user_service.set_active(id, true).await?;
    Ok(Json(user.into()))
}

/// POST /admin-api/users/{id}/deactivate/
async fn deactivate_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<AuthorResponse>, ApiError> {
    let id = parse_id(&id)?;
    reject_self(&current, id)?;
    let user = state.user_service.set_active(id, false).await?;
    Ok(Json(user.into()))
}

/// DELETE /admin-api/users/{id}/
async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    reject_self(&current, id)?;
    state.user_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
