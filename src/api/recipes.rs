//! Recipe API endpoints
//!
//! - GET    /recipes-api/       - Paginated published recipes
//! - POST   /recipes-api/       - Create a recipe (authenticated)
//! - GET    /recipes-api/{id}/  - One published recipe
//! - PATCH  /recipes-api/{id}/  - Partial update (author only)
//! - DELETE /recipes-api/{id}/  - Delete (author only)
//!
//! `category_id` narrows both the list and the detail lookup.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::{page_link, parse_id, BaseUrl, RequestBody};
use crate::api::middleware::{ApiError, AppState, CurrentUser, MaybeUser};
use crate::api::permissions::IsOwner;
use crate::api::responses::{recipe_detail_path, PaginatedResponse, RecipeResponse};
use crate::models::{PageRequest, RecipeFilter};
use crate::services::recipe_validator::{is_empty_body, UPDATABLE_FIELDS};
use crate::services::RecipeServiceError;

const UPDATE_HINT: &str = "Pass the fields you want to update";

/// Query parameters shared by the list and detail endpoints
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub category_id: Option<String>,
    pub page: Option<String>,
}

impl RecipeQuery {
    fn filter(&self) -> RecipeFilter {
        RecipeFilter::from_query(self.category_id.as_deref())
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(e: RecipeServiceError) -> Self {
        match e {
            RecipeServiceError::NotFound(_) => ApiError::not_found("No Recipe matches the given query."),
            RecipeServiceError::InvalidPage => ApiError::not_found("Invalid page."),
            RecipeServiceError::ValidationError(errors) => ApiError::validation(&errors),
            RecipeServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

/// Build the recipes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes-api/",
            get(list_recipes).post(create_recipe).options(list_options),
        )
        .route(
            "/recipes-api/{id}/",
            get(get_recipe)
                .patch(partial_update_recipe)
                .delete(delete_recipe)
                .options(detail_options),
        )
}

/// GET /recipes-api/
async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
    base: BaseUrl,
    uri: Uri,
) -> Result<Json<PaginatedResponse<RecipeResponse>>, ApiError> {
    let page = PageRequest::parse(query.page.as_deref())
        .ok_or_else(|| ApiError::not_found("Invalid page."))?;

    let result = state
        .recipe_service
        .list_published(&query.filter(), page)
        .await?;

    let next = result
        .has_next()
        .then(|| page_link(&base, &uri, Some(result.page + 1)));
    let previous = result
        .has_prev()
        .then(|| page_link(&base, &uri, (result.page > 2).then(|| result.page - 1)));

    Ok(Json(PaginatedResponse {
        count: result.total,
        next,
        previous,
        results: result
            .items
            .into_iter()
            .map(|item| RecipeResponse::new(item, &base))
            .collect(),
    }))
}

/// POST /recipes-api/
///
/// The author is always the caller; an `author` key in the body is ignored.
async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    base: BaseUrl,
    body: RequestBody,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.into_value()?;
    let created = state.recipe_service.create(&body, user.id).await?;

    let location = base.absolute(&recipe_detail_path(created.recipe.id));
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(RecipeResponse::new(created, &base)),
    ))
}

/// GET /recipes-api/{id}/
async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecipeQuery>,
    base: BaseUrl,
) -> Result<Json<RecipeResponse>, ApiError> {
    let id = parse_id(&id)?;
    let recipe = state.recipe_service.get_published(id, &query.filter()).await?;
    Ok(Json(RecipeResponse::new(recipe, &base)))
}

/// PATCH /recipes-api/{id}/
///
/// Checked in order: lookup (404), ownership (401/403), then the body.
async fn partial_update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecipeQuery>,
    MaybeUser(user): MaybeUser,
    base: BaseUrl,
    body: RequestBody,
) -> Result<Json<RecipeResponse>, ApiError> {
    let id = parse_id(&id)?;
    let current = state.recipe_service.get_published(id, &query.filter()).await?;
    IsOwner::check(user.as_ref(), &current.recipe)?;

    let body = body.into_value()?;
    if is_empty_body(&body) {
        return Err(ApiError::with_details(
            "BAD_REQUEST",
            UPDATE_HINT,
            serde_json::json!({ UPDATE_HINT: UPDATABLE_FIELDS }),
        ));
    }

    let updated = state
        .recipe_service
        .partial_update(&current.recipe, &body)
        .await?;
    Ok(Json(RecipeResponse::new(updated, &base)))
}

/// DELETE /recipes-api/{id}/
async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecipeQuery>,
    MaybeUser(user): MaybeUser,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    let current = state.recipe_service.get_published(id, &query.filter()).await?;
    IsOwner::check(user.as_ref(), &current.recipe)?;

    state.recipe_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_options() -> impl IntoResponse {
    options_response("Recipe List", "GET, POST, HEAD, OPTIONS")
}

async fn detail_options() -> impl IntoResponse {
    options_response("Recipe Instance", "GET, PATCH, DELETE, HEAD, OPTIONS")
}

fn options_response(name: &'static str, allow: &'static str) -> impl IntoResponse {
    (
        [(header::ALLOW, allow)],
        Json(serde_json::json!({
            "name": name,
            "renders": ["application/json"],
            "parses": ["application/json", "application/x-www-form-urlencoded"],
        })),
    )
}
