use std::sync::Arc;

use axum::{
    extract::State,
    Json,
};
use tracing::error;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{ChatError, ChatRequest, ChatResponse};
use crate::services::assistant::AssistantService;

/// The chat endpoint. An unknown clinic is a real 404; any other failure
/// keeps the HTTP 200 apology contract so chat frontends always have a
/// message to render.
#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Ok(Json(ChatResponse::empty_prompt()));
    }

    let assistant = AssistantService::new(&state);

    match assistant.handle_message(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(ChatError::ClinicNotFound(slug)) => {
            Err(AppError::NotFound(format!("Clinic not found: {}", slug)))
        }
        Err(e) => {
            error!("Chat turn failed: {}", e);
            Ok(Json(ChatResponse::apology(e.to_string())))
        }
    }
}
