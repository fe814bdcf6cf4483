//! Token API endpoints
//!
//! - POST /token/          - Exchange username/password for an access/refresh pair
//! - POST /token/refresh/  - Exchange a refresh token for a new access token
//! - POST /token/verify/   - Check a token of either type

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::api::common::{required_string, RequestBody};
use crate::api::middleware::{ApiError, AppState};
use crate::services::{FieldErrors, TokenError, TokenPair, UserServiceError};

/// Seconds a rate-limited username is told to wait
const RETRY_AFTER_SECS: i64 = 15 * 60;

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Generation(cause) => ApiError::internal(cause),
            other => {
                tracing::debug!("Token rejected: {}", other);
                ApiError::unauthorized("Token is invalid or expired")
            }
        }
    }
}

/// Build the token router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/token/", post(obtain_token))
        .route("/token/refresh/", post(refresh_token))
        .route("/token/verify/", post(verify_token))
}

/// POST /token/
async fn obtain_token(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<Json<TokenPair>, ApiError> {
    let body = body.into_value()?;
    let mut errors = FieldErrors::new();
    let username = required_string(&body, "username", &mut errors);
    let password = required_string(&body, "password", &mut errors);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::validation(&errors));
    };

    if state.rate_limiter.is_limited(&username).await {
        tracing::warn!(username = %username, "Token request rate limited");
        return Err(ApiError::rate_limited(
            "Too many failed login attempts. Try again later.",
            RETRY_AFTER_SECS,
        ));
    }

    let user = match state.user_service.authenticate(&username, &password).await {
        Ok(user) => user,
        Err(UserServiceError::AuthenticationError) => {
            state.rate_limiter.record_failure(&username).await;
            tracing::info!(username = %username, "Failed token request");
            return Err(ApiError::unauthorized(
                "No active account found with the given credentials",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    state.rate_limiter.clear(&username).await;
    let tokens = state.token_service.issue_pair(&user)?;
    tracing::debug!(user_id = user.id, "Issued token pair");
    Ok(Json(tokens))
}

/// POST /token/refresh/
async fn refresh_token(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let body = body.into_value()?;
    let mut errors = FieldErrors::new();
    let Some(refresh) = required_string(&body, "refresh", &mut errors) else {
        return Err(ApiError::validation(&errors));
    };

    let access = state.token_service.refresh(&refresh)?;
    Ok(Json(AccessTokenResponse { access }))
}

/// POST /token/verify/
async fn verify_token(
    State(state): State<AppState>,
    body: RequestBody,
) -> Result<Json<Value>, ApiError> {
    let body = body.into_value()?;
    let mut errors = FieldErrors::new();
    let Some(token) = required_string(&body, "token", &mut errors) else {
        return Err(ApiError::validation(&errors));
    };

    state.token_service.validate(&token)?;
    Ok(Json(serde_json::json!({})))
}
