use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Clinic row from the `clinics` table. `clinic_id` is the human-readable
/// slug used in every request; `id` is the row UUID the other tables
/// reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub clinic_id: String,
    pub clinic_name: String,
    pub phone: Option<String>,
    pub whatsapp_contact: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub config: ClinicConfig,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_timezone() -> String {
    "Asia/Karachi".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
}

/// Opening hours as "HH:MM" strings, the shape stored in the clinic's
/// `config` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub speciality: Option<String>,
    pub calendar_email: Option<String>,
    pub timings: Option<String>,
    /// Service name -> duration display string, e.g. "Hydrafacial" -> "60 min".
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

/// The assembled per-clinic view a single chat turn operates on.
#[derive(Debug, Clone, Serialize)]
pub struct ClinicDirectory {
    pub clinic: Clinic,
    pub doctors: Vec<Doctor>,
}

/// Result of resolving a requested service to a doctor.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMatch {
    pub doctor_name: String,
    pub calendar_email: Option<String>,
    pub speciality: Option<String>,
    /// The catalog name the request matched (may differ in case/phrasing).
    pub service_name: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub doctor_name: String,
    pub doctor_email: Option<String>,
    pub speciality: Option<String>,
    pub timings: Option<String>,
    pub duration_minutes: i64,
    pub duration_display: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinicRequest {
    pub clinic_id: String,
    pub clinic_name: String,
    pub phone: Option<String>,
    pub whatsapp_contact: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub config: ClinicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSummary {
    pub clinic_id: String,
    pub clinic_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClinicInfo {
    pub name: String,
    pub timezone: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClinicServicesResponse {
    pub services: BTreeMap<String, ServiceInfo>,
    pub clinic_info: ClinicInfo,
}

#[derive(Error, Debug)]
pub enum ClinicError {
    #[error("Clinic not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<ClinicError> for shared_models::error::AppError {
    fn from(err: ClinicError) -> Self {
        match err {
            ClinicError::NotFound(slug) => Self::NotFound(format!("Clinic not found: {}", slug)),
            ClinicError::Database(msg) => Self::Database(msg),
        }
    }
}
