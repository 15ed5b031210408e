use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use scheduling_cell::models::CalendarStatus;
use scheduling_cell::services::google_calendar::GoogleCalendarClient;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::SupabaseStatus;

pub struct HealthService {
    supabase: SupabaseClient,
    calendar: GoogleCalendarClient,
}

impl HealthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            calendar: GoogleCalendarClient::new(config),
        }
    }

    /// Cheap round-trip to PostgREST to prove connectivity.
    pub async fn check_supabase(&self) -> SupabaseStatus {
        let probe: Result<Vec<Value>, _> = self.supabase.request(
            Method::GET,
            "/rest/v1/clinics?select=id&limit=1",
            None,
            None,
        ).await;

        match probe {
            Ok(_) => {
                debug!("Supabase health probe succeeded");
                SupabaseStatus { connected: true, error: None }
            }
            Err(e) => SupabaseStatus {
                connected: false,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn calendar_status(&self) -> CalendarStatus {
        self.calendar.status()
    }
}
