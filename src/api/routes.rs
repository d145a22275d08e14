//! API route definitions
//!
//! - /api/v1/health - snapshot statistics
//! - /api/v1/categories - category names in source order
//! - /api/v1/categories/:name - entries of one category
//! - /api/v1/tags/:tag - entries carrying a tag
//! - /api/v1/search?q=&limit= - ranked keyword search
//! - /api/v1/context?q=&top_k= - reference-context block for prompt builders
//! - /api/v1/reload - rebuild from the source directory

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};

/// Create all knowledge base API routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/categories", get(handlers::list_categories))
        .route("/categories/:name", get(handlers::get_category))
        .route("/tags/:tag", get(handlers::get_tag))
        .route("/search", get(handlers::search))
        .route("/context", get(handlers::compose_context))
        .route("/reload", post(handlers::reload))
        .with_state(state)
}
