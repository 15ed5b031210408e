use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use clinic_cell::models::ClinicDirectory;
use clinic_cell::services::catalog;
use shared_config::AppConfig;

use crate::models::{AvailableSlot, SchedulingError};
use crate::services::google_calendar::GoogleCalendarClient;
use crate::services::slots;

/// Finds free appointment slots for a service: resolves the doctor from the
/// clinic catalog, builds the day grid, and filters it against the doctor's
/// calendar.
pub struct AvailabilityService {
    calendar: Arc<GoogleCalendarClient>,
    default_start_hour: u32,
    default_end_hour: u32,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig, calendar: Arc<GoogleCalendarClient>) -> Self {
        Self {
            calendar,
            default_start_hour: config.default_start_hour,
            default_end_hour: config.default_end_hour,
        }
    }

    pub async fn available_slots(
        &self,
        directory: &ClinicDirectory,
        service: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableSlot>, SchedulingError> {
        let matched = catalog::find_doctor_for_service(directory, service)
            .ok_or_else(|| SchedulingError::NoDoctorForService { service: service.to_string() })?;

        let calendar_email = matched.calendar_email.clone()
            .ok_or_else(|| SchedulingError::MissingCalendarEmail { doctor: matched.doctor_name.clone() })?;

        let tz: Tz = directory.clinic.timezone.parse()
            .map_err(|_| SchedulingError::UnknownTimezone(directory.clinic.timezone.clone()))?;

        let (open_hour, close_hour) = catalog::working_hours(
            directory,
            self.default_start_hour,
            self.default_end_hour,
        );

        debug!(
            "Calculating slots for '{}' ({}min, Dr. {}) on {}",
            matched.service_name, matched.duration_minutes, matched.doctor_name, date
        );

        let candidates = slots::generate_day_slots(
            date,
            matched.duration_minutes,
            tz,
            open_hour,
            close_hour,
            now,
        );

        let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
            return Ok(Vec::new());
        };

        let window_start = first.datetime_utc;
        let window_end = last.datetime_utc + Duration::minutes(last.duration_minutes);

        let busy = self.calendar.free_busy(&calendar_email, window_start, window_end).await?;
        let free = slots::filter_free(candidates, &busy);

        debug!("Found {} free slots of {}min each", free.len(), matched.duration_minutes);
        Ok(free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_cell::models::{Clinic, ClinicConfig, Doctor};
    use std::collections::BTreeMap;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(supabase_url: &str) -> AppConfig {
        AppConfig {
            openai_api_key: "test-openai-key".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_api_base: "http://localhost:0".to_string(),
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            google_credentials_file: "/nonexistent/credentials.json".to_string(),
            google_calendar_api_base: "http://localhost:0".to_string(),
            default_timezone: "Asia/Karachi".to_string(),
            default_start_hour: 9,
            default_end_hour: 19,
            default_appointment_minutes: 30,
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
        }
    }

    fn directory() -> ClinicDirectory {
        let clinic_uuid = Uuid::new_v4();
        let services: BTreeMap<String, String> =
            [("Braces".to_string(), "60 min".to_string())].into();

        ClinicDirectory {
            clinic: Clinic {
                id: clinic_uuid,
                clinic_id: "skin_and_smile_clinic_lahore".to_string(),
                clinic_name: "Skin and Smile Clinic".to_string(),
                phone: None,
                whatsapp_contact: None,
                address: None,
                timezone: "Asia/Karachi".to_string(),
                config: ClinicConfig::default(),
                created_at: None,
                updated_at: None,
            },
            doctors: vec![Doctor {
                id: Uuid::new_v4(),
                clinic_id: clinic_uuid,
                name: "Azeem Rauf".to_string(),
                speciality: Some("Orthodontist".to_string()),
                calendar_email: Some("doc@example.com".to_string()),
                timings: None,
                services,
            }],
        }
    }

    #[tokio::test]
    async fn slots_are_filtered_by_the_doctors_calendar() {
        let mock_server = MockServer::start().await;

        // Busy 09:00-10:00 local (04:00-05:00Z): the first 60-minute slot
        // disappears.
        Mock::given(method("POST"))
            .and(path("/freeBusy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "calendars": {
                    "doc@example.com": {
                        "busy": [
                            { "start": "2025-07-21T04:00:00Z", "end": "2025-07-21T05:00:00Z" }
                        ]
                    }
                }
            })))
            .mount(&mock_server)
            .await;

        let calendar = Arc::new(GoogleCalendarClient::with_static_token(&mock_server.uri(), "test-token"));
        let service = AvailabilityService::new(&test_config("http://localhost:0"), calendar);

        let free = service.available_slots(
            &directory(),
            "braces",
            "2025-07-21".parse().unwrap(),
            "2025-07-01T08:00:00Z".parse().unwrap(),
        ).await.unwrap();

        assert_eq!(free.len(), 9);
        assert_eq!(free[0].start_time, "10:00");
    }

    #[tokio::test]
    async fn unknown_service_is_an_error() {
        let calendar = Arc::new(GoogleCalendarClient::with_static_token("http://localhost:0", "t"));
        let service = AvailabilityService::new(&test_config("http://localhost:0"), calendar);

        let err = service.available_slots(
            &directory(),
            "MRI scan",
            "2025-07-21".parse().unwrap(),
            "2025-07-01T08:00:00Z".parse().unwrap(),
        ).await.unwrap_err();

        assert!(matches!(err, SchedulingError::NoDoctorForService { .. }));
    }
}
