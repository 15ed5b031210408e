use std::sync::Arc;

use axum::{extract::State, Json};

use scheduling_cell::models::CalendarStatus;
use shared_config::AppConfig;

use crate::models::{HealthReport, ServicesHealth};
use crate::services::health::HealthService;

#[axum::debug_handler]
pub async fn health_check(State(state): State<Arc<AppConfig>>) -> Json<HealthReport> {
    let health = HealthService::new(&state);

    let supabase = health.check_supabase().await;
    let calendar = health.calendar_status();

    Json(HealthReport {
        status: "healthy".to_string(),
        services: ServicesHealth { calendar, supabase },
    })
}

#[axum::debug_handler]
pub async fn calendar_status(State(state): State<Arc<AppConfig>>) -> Json<CalendarStatus> {
    let health = HealthService::new(&state);

    Json(health.calendar_status())
}
