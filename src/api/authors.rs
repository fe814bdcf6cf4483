//! Author API endpoints
//!
//! - POST /authors-api/     - Register an author
//! - GET  /authors-api/me/  - The authenticated caller

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::RequestBody;
use crate::api::middleware::{ApiError, AppState, CurrentUser};
use crate::api::responses::AuthorResponse;
use crate::models::CreateUserInput;
use crate::services::{FieldErrors, UserServiceError};

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError => {
                ApiError::unauthorized("No active account found with the given credentials")
            }
            UserServiceError::NotFound(_) => ApiError::not_found("No User matches the given query."),
            UserServiceError::ValidationError(errors) => ApiError::validation(&errors),
            UserServiceError::InternalError(e) => ApiError::internal(e),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: Option<String>,
    password: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

/// Registration, reachable with or without a bearer header
pub fn public_router() -> Router<AppState> {
    Router::new().route("/authors-api/", post(register))
}

/// Routes that act on the authenticated caller
pub fn router() -> Router<AppState> {
    Router::new().route("/authors-api/me/", get(me))
}

/// POST /authors-api/
async fn register(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<(StatusCode, Json<AuthorResponse>), ApiError> {
    let body = body.into_value()?;
    let body = if body.is_null() { serde_json::json!({}) } else { body };
    let request: RegisterRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid data - {}", e)))?;

    let mut errors = FieldErrors::new();
    if request.username.is_none() {
        errors.add("username", "This field is required.");
    }
    if request.password.is_none() {
        errors.add("password", "This field is required.");
    }
    let (Some(username), Some(password)) = (request.username, request.password) else {
        return Err(ApiError::validation(&errors));
    };

    let input = CreateUserInput {
        username,
        password,
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
    };
    let user = state.user_service.register(input).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /authors-api/me/
async fn me(CurrentUser(user): CurrentUser) -> Json<AuthorResponse> {
    Json(user.into())
}
