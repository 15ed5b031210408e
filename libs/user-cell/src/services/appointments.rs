use anyhow::Result;
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

pub const APPOINTMENTS_LIMIT: usize = 10;

pub struct AppointmentHistoryService {
    supabase: SupabaseClient,
}

impl AppointmentHistoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Recent appointments for the user, newest first, with the doctor name
    /// embedded via the PostgREST resource join.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        clinic_uuid: Uuid,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&clinic_id=eq.{}&select=*,doctors(name)&order=appointment_datetime.desc&limit={}",
            user_id, clinic_uuid, limit
        );

        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows)
    }
}
