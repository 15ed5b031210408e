use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use clinic_cell::services::clinic::ClinicService;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{UserAppointmentsResponse, UserHistoryResponse};
use crate::services::{
    appointments::{AppointmentHistoryService, APPOINTMENTS_LIMIT},
    session::{SessionService, HISTORY_LIMIT},
    user::UserService,
};

#[derive(Debug, Deserialize)]
pub struct ClinicScope {
    pub clinic_id: String,
}

#[axum::debug_handler]
pub async fn get_user_history(
    State(state): State<Arc<AppConfig>>,
    Path(phone_number): Path<String>,
    Query(scope): Query<ClinicScope>,
) -> Result<Json<UserHistoryResponse>, AppError> {
    let clinic_uuid = ClinicService::new(&state)
        .resolve_clinic_uuid(&scope.clinic_id)
        .await?;

    let user = UserService::new(&state)
        .get_or_create(&phone_number, clinic_uuid, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let sessions = SessionService::new(&state);
    let session = sessions.get_or_create_session(user.id, clinic_uuid)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let messages = sessions.load_history(session.id, HISTORY_LIMIT)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(UserHistoryResponse {
        messages,
        session_id: Some(session.id),
        user_id: user.id,
    }))
}

#[axum::debug_handler]
pub async fn get_user_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(phone_number): Path<String>,
    Query(scope): Query<ClinicScope>,
) -> Result<Json<UserAppointmentsResponse>, AppError> {
    let clinic_uuid = ClinicService::new(&state)
        .resolve_clinic_uuid(&scope.clinic_id)
        .await?;

    let user = UserService::new(&state)
        .get_or_create(&phone_number, clinic_uuid, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    let appointments = AppointmentHistoryService::new(&state)
        .list_for_user(user.id, clinic_uuid, APPOINTMENTS_LIMIT)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(UserAppointmentsResponse {
        appointments,
        user_id: user.id,
    }))
}

#[axum::debug_handler]
pub async fn clear_user_history(
    State(state): State<Arc<AppConfig>>,
    Path(phone_number): Path<String>,
    Query(scope): Query<ClinicScope>,
) -> Result<Json<Value>, AppError> {
    let clinic_uuid = ClinicService::new(&state)
        .resolve_clinic_uuid(&scope.clinic_id)
        .await?;

    let user = UserService::new(&state)
        .get_or_create(&phone_number, clinic_uuid, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    SessionService::new(&state)
        .clear_for_user(user.id, clinic_uuid)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "message": "Chat history cleared successfully" })))
}
