use axum::{routing::get, Router};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Department routes
        .route("/departments", get(handlers::department::get_departments))
        .route("/departments/lookup", get(handlers::department::lookup_department))
        .route("/departments/:id/path", get(handlers::department::get_department_path))
        .route("/departments/:id/subtree", get(handlers::department::get_department_subtree))
        // People routes
        .route("/people", get(handlers::people::people_page))
        .route("/hashicorp", get(handlers::people::search_people));

    // Static file service for frontend
    // Falls back to index.html for SPA routing
    let static_dir = state.config.static_dir.clone();
    let index_file = static_dir.join("index.html");
    let serve_dir = ServeDir::new(&static_dir).not_found_service(ServeFile::new(index_file));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
