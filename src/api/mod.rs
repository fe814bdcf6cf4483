//! API layer - HTTP handlers and routing
//!
//! - Recipe API endpoints (`/recipes-api/`)
//! - Tag and category read endpoints
//! - Author registration (`/authors-api/`)
//! - JWT token endpoints (`/token/`)
//! - Staff moderation (`/admin-api/`)

pub mod admin;
pub mod authors;
pub mod categories;
pub mod common;
pub mod middleware;
pub mod permissions;
pub mod recipes;
pub mod responses;
pub mod tags;
pub mod token;


use axum::{middleware as axum_middleware, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState};

/// Build the API routes with their authentication layers
///
/// Token and registration routes ignore the `Authorization` header, so a
/// client holding an expired access token can still log in or refresh.
/// Everything else goes through bearer authentication.
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let authenticated_routes = Router::new()
        .merge(recipes::router())
        .merge(tags::router())
        .merge(categories::router())
        .merge(authors::router())
        .merge(admin::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::authenticate,
        ));

    Router::new()
        .merge(token::router())
        .merge(authors::public_router())
        .merge(authenticated_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    build_api_router(state.clone())
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}
