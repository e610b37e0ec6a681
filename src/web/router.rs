//! Router configuration for Web API.

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{download_file, list_files, upload_file, AppState};

/// Create the main API router.
///
/// `max_upload_bytes` bounds the request body of an upload.
pub fn create_router(app_state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let file_routes = Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/:filename", get(download_file));

    let api_routes = Router::new().nest("/files", file_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_health_check() {
        let server = TestServer::new(create_health_router()).unwrap();

        let response = server.get("/health").await;

        response.assert_status_ok();
        response.assert_text("OK");
    }
}
