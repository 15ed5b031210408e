//! Service catalog helpers over a `ClinicDirectory`: which doctor provides a
//! requested service, how long it takes, and what the clinic offers overall.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{ClinicDirectory, ServiceInfo, ServiceMatch};

pub const FALLBACK_DURATION_MINUTES: i64 = 30;

/// Parse a duration display string like "60 min" down to minutes. Anything
/// unparseable falls back so a misconfigured catalog entry never fails a
/// booking.
pub fn parse_duration_minutes(duration: &str) -> i64 {
    duration
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(FALLBACK_DURATION_MINUTES)
}

/// Find the doctor who provides `service`. An exact (case-insensitive) name
/// match on any doctor wins over a substring match in either direction.
pub fn find_doctor_for_service(directory: &ClinicDirectory, service: &str) -> Option<ServiceMatch> {
    let wanted = service.to_lowercase();

    for doctor in &directory.doctors {
        for (name, duration) in &doctor.services {
            if name.to_lowercase() == wanted {
                debug!("Exact service match: Dr. {} provides '{}'", doctor.name, name);
                return Some(to_match(doctor, name, duration));
            }
        }
    }

    for doctor in &directory.doctors {
        for (name, duration) in &doctor.services {
            let candidate = name.to_lowercase();
            if candidate.contains(&wanted) || wanted.contains(&candidate) {
                debug!(
                    "Partial service match: Dr. {} provides '{}' for requested '{}'",
                    doctor.name, name, service
                );
                return Some(to_match(doctor, name, duration));
            }
        }
    }

    debug!("No doctor found for service '{}'", service);
    None
}

fn to_match(doctor: &crate::models::Doctor, name: &str, duration: &str) -> ServiceMatch {
    ServiceMatch {
        doctor_name: doctor.name.clone(),
        calendar_email: doctor.calendar_email.clone(),
        speciality: doctor.speciality.clone(),
        service_name: name.to_string(),
        duration_minutes: parse_duration_minutes(duration),
    }
}

/// Every service across the clinic's doctors, keyed by service name.
pub fn service_catalog(directory: &ClinicDirectory) -> BTreeMap<String, ServiceInfo> {
    let mut catalog = BTreeMap::new();

    for doctor in &directory.doctors {
        for (name, duration) in &doctor.services {
            catalog.insert(name.clone(), ServiceInfo {
                doctor_name: doctor.name.clone(),
                doctor_email: doctor.calendar_email.clone(),
                speciality: doctor.speciality.clone(),
                timings: doctor.timings.clone(),
                duration_minutes: parse_duration_minutes(duration),
                duration_display: duration.clone(),
            });
        }
    }

    catalog
}

/// Clinic opening hours as whole hours, from `config.working_hours` when
/// present, otherwise the configured defaults.
pub fn working_hours(directory: &ClinicDirectory, default_start: u32, default_end: u32) -> (u32, u32) {
    if let Some(hours) = &directory.clinic.config.working_hours {
        if let (Some(start), Some(end)) = (parse_hour(&hours.start), parse_hour(&hours.end)) {
            return (start, end);
        }
    }
    (default_start, default_end)
}

fn parse_hour(time: &str) -> Option<u32> {
    time.split(':').next()?.parse().ok().filter(|h| *h < 24)
}
