use serde::Serialize;

use scheduling_cell::models::CalendarStatus;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub services: ServicesHealth,
}

#[derive(Debug, Serialize)]
pub struct ServicesHealth {
    pub calendar: CalendarStatus,
    pub supabase: SupabaseStatus,
}

#[derive(Debug, Serialize)]
pub struct SupabaseStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
