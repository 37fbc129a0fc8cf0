// Library exports for the API binary, operator tools and tests
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use services::announcements::AnnouncementService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub announcements: Arc<AnnouncementService>,
}

impl AppState {
    pub fn new(announcements: AnnouncementService) -> Self {
        Self {
            announcements: Arc::new(announcements),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Announcements (both with and without trailing slash)
        .route(
            "/announcements",
            get(routes::announcements::list_active).post(routes::announcements::create_announcement),
        )
        .route(
            "/announcements/",
            get(routes::announcements::list_active).post(routes::announcements::create_announcement),
        )
        .route("/announcements/manage", get(routes::announcements::list_all))
        .route(
            "/announcements/{id}",
            put(routes::announcements::update_announcement)
                .delete(routes::announcements::delete_announcement),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
