//! API middleware
//!
//! Contains:
//! - `AppState`, the shared services handed to every handler
//! - `ApiError`, the JSON error body and its status mapping
//! - Bearer-token authentication, the staff check and the user extractors
//!   built on them

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxRecipeRepository, SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    extract_bearer, CategoryService, FieldErrors, LoginRateLimiter, RecipeService, TagService,
    TokenService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub token_service: Arc<TokenService>,
    pub recipe_service: Arc<RecipeService>,
    pub tag_service: Arc<TagService>,
    pub category_service: Arc<CategoryService>,
    pub rate_limiter: Arc<LoginRateLimiter>,
}

impl AppState {
    /// Wire repositories, cache and services over an open pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> Self {
        let cache = create_cache(&config.cache);

        let users = SqlxUserRepository::boxed(pool.clone());
        let recipes = SqlxRecipeRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let tags = SqlxTagRepository::boxed(pool.clone());

        Self {
            user_service: Arc::new(UserService::new(users)),
            token_service: Arc::new(TokenService::new(&config.auth)),
            recipe_service: Arc::new(RecipeService::with_page_size(
                recipes,
                categories.clone(),
                tags.clone(),
                config.api.page_size,
            )),
            tag_service: Arc::new(TagService::new(tags, cache.clone())),
            category_service: Arc::new(CategoryService::new(categories, cache)),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            pool,
        }
    }
}

/// Authenticated user, stored in request extensions by [`authenticate`]
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    /// 401 for an anonymous request to an endpoint that needs a user
    pub fn not_authenticated() -> Self {
        Self::unauthorized("Authentication credentials were not provided.")
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    /// 400 carrying a field → messages map
    pub fn validation(errors: &FieldErrors) -> Self {
        Self::with_details("VALIDATION_ERROR", "Invalid input.", errors.to_json())
    }

    pub fn unsupported_media_type(content_type: &str) -> Self {
        Self::new(
            "UNSUPPORTED_MEDIA_TYPE",
            format!("Unsupported media type \"{}\" in request.", content_type),
        )
    }

    pub fn rate_limited(message: impl Into<String>, retry_after_secs: i64) -> Self {
        Self::with_details(
            "RATE_LIMIT",
            message,
            serde_json::json!({ "retry_after": retry_after_secs }),
        )
    }

    /// 500 with a generic message. The cause is logged, never returned.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!("Internal error: {}", cause);
        Self::new("INTERNAL_ERROR", "A server error occurred.")
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "BAD_REQUEST" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "UNSUPPORTED_MEDIA_TYPE" => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "RATE_LIMIT" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer realm=\"api\""));
        }
        response
    }
}

/// Authentication middleware
///
/// Without an `Authorization: Bearer` header the request continues
/// anonymously. With one, the token must be a valid access token for an
/// active user; anything else is a 401, even on public endpoints.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header_value = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::unauthorized("Invalid Authorization header."))?
            .to_string(),
        None => return Ok(next.run(request).await),
    };

    // Other schemes are not ours to judge
    if header_value.split_whitespace().next() != Some("Bearer") {
        return Ok(next.run(request).await);
    }

    let token = extract_bearer(&header_value).ok_or_else(|| {
        ApiError::unauthorized("Authorization header must contain two space-delimited values")
    })?;

    let claims = state.token_service.validate_access(token).map_err(|e| {
        tracing::debug!("Rejected bearer token: {}", e);
        ApiError::unauthorized("Given token not valid for any token type")
    })?;
    let user_id = claims
        .user_id()
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let user = state
        .user_service
        .get_active(user_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Staff authorization middleware. Must run after [`authenticate`].
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(ApiError::not_authenticated)?;

    if !user.0.is_staff {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }

    Ok(next.run(request).await)
}

/// Extractor for endpoints that require a user. Anonymous requests get 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .map(|au| CurrentUser(au.0.clone()))
            .ok_or_else(ApiError::not_authenticated)
    }
}

/// Extractor for endpoints open to anonymous callers
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts.extensions.get::<AuthenticatedUser>().map(|au| au.0.clone()),
        ))
    }
}
