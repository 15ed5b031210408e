use std::sync::Arc;

use axum::{
    Json, Router,
    routing::get,
};
use serde_json::{json, Value};

use chat_cell::router::chat_routes;
use clinic_cell::router::clinic_routes;
use monitoring_cell::router::health_routes;
use shared_config::AppConfig;
use user_cell::router::user_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let api_v1 = Router::new()
        .nest("/chat", chat_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/health", health_routes(state.clone()));

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", api_v1)
        // Pre-versioning clients still post to /chat
        .nest("/chat", chat_routes(state))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Multi-Clinic Chatbot API",
        "version": "2.0.0",
        "status": "running",
        "health": "/api/v1/health"
    }))
}
