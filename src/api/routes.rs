use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Files (blob operations)
        .route(
            "/files",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/:id", get(handlers::download_file))
        .route("/files/:id", delete(handlers::delete_file))
        // Metadata (index operations)
        .route("/metadata", get(handlers::list_my_files))
        .route("/metadata/public", get(handlers::list_public_files))
        .route("/metadata/search", get(handlers::search_files))
        .route("/metadata/:id", get(handlers::get_metadata))
        .route("/metadata/:id", put(handlers::update_metadata))
        // Usage counters
        .route("/stats", get(handlers::storage_stats))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
