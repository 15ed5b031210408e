// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use clinic_cell::models::ClinicDirectory;
use clinic_cell::services::catalog;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingConfirmation, CalendarEventRequest, EventTime, SchedulingError};
use crate::services::google_calendar::GoogleCalendarClient;
use crate::services::slots::timezone_abbreviation;

pub struct BookingService {
    calendar: Arc<GoogleCalendarClient>,
    supabase: SupabaseClient,
}

impl BookingService {
    pub fn new(config: &AppConfig, calendar: Arc<GoogleCalendarClient>) -> Self {
        Self {
            calendar,
            supabase: SupabaseClient::new(config),
        }
    }

    /// Book an appointment: resolve the doctor for the service, convert the
    /// clinic-local slot to UTC, and create the calendar event.
    pub async fn book(
        &self,
        directory: &ClinicDirectory,
        service: &str,
        patient_name: &str,
        patient_phone: &str,
        slot: &str,
    ) -> Result<BookingConfirmation, SchedulingError> {
        let matched = catalog::find_doctor_for_service(directory, service)
            .ok_or_else(|| SchedulingError::NoDoctorForService { service: service.to_string() })?;

        let calendar_email = matched.calendar_email.clone()
            .ok_or_else(|| SchedulingError::MissingCalendarEmail { doctor: matched.doctor_name.clone() })?;

        let tz: Tz = directory.clinic.timezone.parse()
            .map_err(|_| SchedulingError::UnknownTimezone(directory.clinic.timezone.clone()))?;

        let naive = parse_slot_datetime(slot)?;
        let start_local = tz.from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| SchedulingError::InvalidSlot(slot.to_string()))?;
        let start_utc = start_local.with_timezone(&Utc);
        let end_utc = start_utc + Duration::minutes(matched.duration_minutes);

        info!(
            "Booking '{}' for {} with Dr. {} at {}",
            matched.service_name, patient_name, matched.doctor_name, start_utc
        );

        let event = CalendarEventRequest {
            summary: format!("{} - {}", matched.service_name, patient_name),
            description: format!(
                "Patient: {}\nPhone: {}\nService: {}\nDuration: {} minutes\nDoctor: Dr. {}\n\nClinic: {}\nAddress: {}",
                patient_name,
                patient_phone,
                matched.service_name,
                matched.duration_minutes,
                matched.doctor_name,
                directory.clinic.clinic_name,
                directory.clinic.address.as_deref().unwrap_or("N/A"),
            ),
            start: EventTime {
                date_time: start_utc.to_rfc3339(),
                time_zone: "UTC".to_string(),
            },
            end: EventTime {
                date_time: end_utc.to_rfc3339(),
                time_zone: "UTC".to_string(),
            },
        };

        let created = self.calendar.insert_event(&calendar_email, &event).await?;

        let timezone_abbr = timezone_abbreviation(&start_local, tz);
        let display = format!(
            "{} {}",
            start_local.format("%A, %B %d at %I:%M %p"),
            timezone_abbr
        );

        Ok(BookingConfirmation {
            event_id: created.id,
            event_link: created.html_link,
            doctor_name: matched.doctor_name,
            doctor_email: calendar_email,
            service: matched.service_name,
            duration_minutes: matched.duration_minutes,
            start_utc,
            start_local: start_local.fixed_offset(),
            display,
            timezone: tz.name().to_string(),
        })
    }

    /// Persist the booked appointment. The calendar event already exists at
    /// this point, so failures here are for the caller to log, not to show
    /// the patient.
    pub async fn record_appointment(
        &self,
        user_id: Uuid,
        clinic_uuid: Uuid,
        confirmation: &BookingConfirmation,
        patient_name: &str,
        patient_phone: &str,
    ) -> anyhow::Result<()> {
        let doctor_path = format!(
            "/rest/v1/doctors?clinic_id=eq.{}&calendar_email=eq.{}&select=id",
            clinic_uuid,
            urlencoding::encode(&confirmation.doctor_email)
        );
        let doctor_rows: Vec<Value> = self.supabase.request(Method::GET, &doctor_path, None, None).await?;
        let doctor_id = doctor_rows.first()
            .and_then(|row| row["id"].as_str())
            .map(str::to_string);

        let row = json!({
            "user_id": user_id,
            "clinic_id": clinic_uuid,
            "doctor_id": doctor_id,
            "patient_name": patient_name,
            "patient_phone": patient_phone,
            "service": confirmation.service,
            "appointment_datetime": confirmation.start_utc.to_rfc3339(),
            "duration_minutes": confirmation.duration_minutes,
            "calendar_event_id": confirmation.event_id,
            "calendar_event_link": confirmation.event_link,
            "status": "confirmed",
        });

        self.supabase.execute(Method::POST, "/rest/v1/appointments", None, Some(row)).await?;

        debug!("Appointment saved for user {}", user_id);
        Ok(())
    }
}

pub fn parse_slot_datetime(slot: &str) -> Result<NaiveDateTime, SchedulingError> {
    NaiveDateTime::parse_from_str(slot, "%Y-%m-%d %I:%M %p")
        .or_else(|_| NaiveDateTime::parse_from_str(slot, "%Y-%m-%d %H:%M"))
        .map_err(|_| SchedulingError::InvalidSlot(slot.to_string()))
}

/// The patient-facing confirmation text the assistant relays verbatim.
pub fn confirmation_message(
    directory: &ClinicDirectory,
    confirmation: &BookingConfirmation,
    patient_name: &str,
) -> String {
    let clinic = &directory.clinic;
    let contact = clinic.whatsapp_contact.as_deref()
        .or(clinic.phone.as_deref())
        .unwrap_or("the clinic");

    format!(
        "✅ Appointment Confirmed!\n\n\
         Patient: {}\n\
         Service: {}\n\
         Duration: {} minutes\n\
         Date & Time: {}\n\
         Doctor: Dr. {}\n\n\
         📍 Location: {}\n\
         {}\n\n\
         📞 Contact: {}\n\n\
         Please arrive 10 minutes early. Thank you!",
        patient_name,
        confirmation.service,
        confirmation.duration_minutes,
        confirmation.display,
        confirmation.doctor_name,
        clinic.clinic_name,
        clinic.address.as_deref().unwrap_or("N/A"),
        contact,
    )
}

pub fn failure_message(directory: &ClinicDirectory, error: &SchedulingError) -> String {
    let phone = directory.clinic.phone.as_deref()
        .or(directory.clinic.whatsapp_contact.as_deref())
        .unwrap_or("the clinic");

    format!(
        "Sorry, there was an error booking your appointment: {}. Please try again or call us at {}.",
        error, phone
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_cell::models::{Clinic, ClinicConfig, Doctor};
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn directory() -> ClinicDirectory {
        let clinic_uuid = Uuid::new_v4();
        let services: BTreeMap<String, String> =
            [("Hydrafacial".to_string(), "60 min".to_string())].into();

        ClinicDirectory {
            clinic: Clinic {
                id: clinic_uuid,
                clinic_id: "skin_and_smile_clinic_lahore".to_string(),
                clinic_name: "Skin and Smile Clinic".to_string(),
                phone: Some("03458589440".to_string()),
                whatsapp_contact: Some("03001234567".to_string()),
                address: Some("Johar Town, Lahore".to_string()),
                timezone: "Asia/Karachi".to_string(),
                config: ClinicConfig::default(),
                created_at: None,
                updated_at: None,
            },
            doctors: vec![Doctor {
                id: Uuid::new_v4(),
                clinic_id: clinic_uuid,
                name: "Wajeeha Nusrat".to_string(),
                speciality: Some("Dermatologist".to_string()),
                calendar_email: Some("derma@example.com".to_string()),
                timings: None,
                services,
            }],
        }
    }

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

    #[test]
    fn slot_parsing_accepts_both_formats() {
        let twelve_hour = parse_slot_datetime("2025-07-21 09:30 AM").unwrap();
        let twenty_four = parse_slot_datetime("2025-07-21 09:30").unwrap();
        assert_eq!(twelve_hour, twenty_four);

        let afternoon = parse_slot_datetime("2025-07-21 02:15 PM").unwrap();
        assert_eq!(afternoon.format("%H:%M").to_string(), "14:15");

        assert!(parse_slot_datetime("tomorrow at nine").is_err());
    }

    #[tokio::test]
    async fn booking_creates_a_utc_calendar_event() {
        let mock_server = MockServer::start().await;

        // 10:00 local Karachi time is 05:00Z.
        Mock::given(method("POST"))
            .and(path("/calendars/derma%40example.com/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Hydrafacial - Ali Khan",
                "start": { "dateTime": "2025-07-21T05:00:00+00:00", "timeZone": "UTC" },
                "end": { "dateTime": "2025-07-21T06:00:00+00:00", "timeZone": "UTC" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "evt_42",
                "htmlLink": "https://calendar.google.com/event?eid=evt_42"
            })))
            .mount(&mock_server)
            .await;

        let calendar = Arc::new(GoogleCalendarClient::with_static_token(&mock_server.uri(), "t"));
        let booking = BookingService::new(&test_config("http://localhost:0"), calendar);

        let confirmation = booking.book(
            &directory(),
            "hydrafacial",
            "Ali Khan",
            "+923001112233",
            "2025-07-21 10:00 AM",
        ).await.unwrap();

        assert_eq!(confirmation.event_id, "evt_42");
        assert_eq!(confirmation.doctor_name, "Wajeeha Nusrat");
        assert_eq!(confirmation.duration_minutes, 60);
        assert_eq!(confirmation.start_utc.to_rfc3339(), "2025-07-21T05:00:00+00:00");
        assert!(confirmation.display.contains("10:00 AM"));
    }

    #[test]
    fn confirmation_message_has_the_booking_details() {
        let confirmation = BookingConfirmation {
            event_id: "evt_42".to_string(),
            event_link: None,
            doctor_name: "Wajeeha Nusrat".to_string(),
            doctor_email: "derma@example.com".to_string(),
            service: "Hydrafacial".to_string(),
            duration_minutes: 60,
            start_utc: "2025-07-21T05:00:00Z".parse().unwrap(),
            start_local: "2025-07-21T10:00:00+05:00".parse().unwrap(),
            display: "Monday, July 21 at 10:00 AM PKT".to_string(),
            timezone: "Asia/Karachi".to_string(),
        };

        let message = confirmation_message(&directory(), &confirmation, "Ali Khan");
        assert!(message.contains("Appointment Confirmed"));
        assert!(message.contains("Ali Khan"));
        assert!(message.contains("60 minutes"));
        assert!(message.contains("Dr. Wajeeha Nusrat"));
        assert!(message.contains("Skin and Smile Clinic"));
        // WhatsApp contact is preferred for the contact line.
        assert!(message.contains("03001234567"));
    }

    #[test]
    fn failure_message_points_at_the_clinic_phone() {
        let error = SchedulingError::NoDoctorForService { service: "MRI scan".to_string() };
        let message = failure_message(&directory(), &error);
        assert!(message.contains("MRI scan"));
        assert!(message.contains("03458589440"));
    }
}
