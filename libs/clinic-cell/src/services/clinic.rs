use anyhow::Result;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Clinic, ClinicDirectory, ClinicError, ClinicSummary, CreateClinicRequest, Doctor};

pub struct ClinicService {
    supabase: SupabaseClient,
}

impl ClinicService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Load the clinic row for a slug together with its doctors.
    pub async fn get_directory(&self, slug: &str) -> Result<ClinicDirectory, ClinicError> {
        let clinic = self.get_clinic(slug).await?;

        let path = format!("/rest/v1/doctors?clinic_id=eq.{}&order=name.asc", clinic.id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let doctors: Vec<Doctor> = rows.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Doctor>, _>>()
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        debug!("Loaded directory for '{}' with {} doctors", clinic.clinic_name, doctors.len());
        Ok(ClinicDirectory { clinic, doctors })
    }

    pub async fn get_clinic(&self, slug: &str) -> Result<Clinic, ClinicError> {
        let path = format!("/rest/v1/clinics?clinic_id=eq.{}", urlencoding::encode(slug));
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = rows.into_iter().next()
            .ok_or_else(|| ClinicError::NotFound(slug.to_string()))?;

        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }

    /// Slug -> clinic row UUID. Resolved once per request; everything else
    /// keys on the UUID.
    pub async fn resolve_clinic_uuid(&self, slug: &str) -> Result<Uuid, ClinicError> {
        let path = format!(
            "/rest/v1/clinics?clinic_id=eq.{}&select=id",
            urlencoding::encode(slug)
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = rows.into_iter().next()
            .ok_or_else(|| ClinicError::NotFound(slug.to_string()))?;

        row["id"].as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| ClinicError::Database("clinic row missing id".to_string()))
    }

    pub async fn list_clinics(&self) -> Result<Vec<ClinicSummary>, ClinicError> {
        let path = "/rest/v1/clinics?select=clinic_id,clinic_name,address,phone&order=clinic_name.asc";
        let rows: Vec<ClinicSummary> = self.supabase.request(Method::GET, path, None, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        Ok(rows)
    }

    pub async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, ClinicError> {
        let body = json!({
            "clinic_id": request.clinic_id,
            "clinic_name": request.clinic_name,
            "phone": request.phone,
            "whatsapp_contact": request.whatsapp_contact,
            "address": request.address,
            "timezone": request.timezone,
            "config": request.config,
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let rows: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/clinics",
            None,
            Some(body),
            Some(headers),
        ).await.map_err(|e| ClinicError::Database(e.to_string()))?;

        let row = rows.into_iter().next()
            .ok_or_else(|| ClinicError::Database("Failed to create clinic".to_string()))?;

        serde_json::from_value(row).map_err(|e| ClinicError::Database(e.to_string()))
    }
}
