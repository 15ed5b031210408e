use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The subset of a Google service-account key file this cell needs. Unknown
/// fields in the JSON are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// An occupied interval on a doctor's calendar, in UTC.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One bookable interval. Times cross the wire in UTC; the display fields
/// are clinic-local and are what the assistant shows to patients.
#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlot {
    pub start_time: String,
    pub end_time: String,
    pub datetime_utc: DateTime<Utc>,
    pub datetime_local: DateTime<FixedOffset>,
    pub formatted_time: String,
    pub formatted_date: String,
    pub formatted_time_only: String,
    pub timezone: String,
    pub timezone_display: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEventRequest {
    pub summary: String,
    pub description: String,
    pub start: EventTime,
    pub end: EventTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedEvent {
    pub id: String,
    #[serde(rename = "htmlLink", default)]
    pub html_link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarStatus {
    pub configured: bool,
    pub client_email: Option<String>,
    pub scope: String,
}

/// Everything the rest of the system needs to know about a booked
/// appointment.
#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub event_id: String,
    pub event_link: Option<String>,
    pub doctor_name: String,
    pub doctor_email: String,
    pub service: String,
    pub duration_minutes: i64,
    pub start_utc: DateTime<Utc>,
    pub start_local: DateTime<FixedOffset>,
    pub display: String,
    pub timezone: String,
}

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Google Calendar is not configured")]
    NotConfigured,

    #[error("No doctor found who provides '{service}'")]
    NoDoctorForService { service: String },

    #[error("No calendar email found for Dr. {doctor}")]
    MissingCalendarEmail { doctor: String },

    #[error("Invalid slot '{0}', expected 'YYYY-MM-DD HH:MM AM/PM'")]
    InvalidSlot(String),

    #[error("Unknown clinic timezone: {0}")]
    UnknownTimezone(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Google Calendar API error: {0}")]
    CalendarApi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
