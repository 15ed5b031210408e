use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn user_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/{phone_number}/history",
            get(handlers::get_user_history).delete(handlers::clear_user_history),
        )
        .route("/{phone_number}/appointments", get(handlers::get_user_appointments))
        .with_state(state)
}
