use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn health_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/calendar", get(handlers::calendar_status))
        .with_state(state)
}
