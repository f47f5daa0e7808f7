pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::letters::handlers as letters;
use crate::state::AppState;
use crate::textgen::handlers as textgen;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Template rendering
        .route(
            "/api/v1/letters/placeholders",
            get(textgen::handle_placeholders),
        )
        .route(
            "/api/v1/letters/default-template",
            get(textgen::handle_default_template),
        )
        .route("/api/v1/letters/generate", post(textgen::handle_generate))
        // Export
        .route("/api/v1/letters/pdf", post(letters::handle_generate_pdf))
        .route("/api/v1/letters/filename", post(letters::handle_filename))
        .fallback(not_found)
        .with_state(state)
}
