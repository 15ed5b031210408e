//! Slot-grid arithmetic. All functions are pure; `now` is always passed in.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::{AvailableSlot, BusyPeriod};

/// Lead time before the earliest bookable slot today.
pub const BOOKING_BUFFER_MINUTES: i64 = 30;

/// Contiguous `duration_minutes` slots between the opening and closing hour
/// of `date`, in the clinic's timezone. A slot must end by closing time.
/// For today, slots start no earlier than `now` plus the booking buffer,
/// snapped forward to the grid; once past closing there are none.
pub fn generate_day_slots(
    date: NaiveDate,
    duration_minutes: i64,
    tz: Tz,
    open_hour: u32,
    close_hour: u32,
    now: DateTime<Utc>,
) -> Vec<AvailableSlot> {
    if duration_minutes <= 0 {
        return Vec::new();
    }

    let (Some(open), Some(close)) = (
        local_datetime(date, open_hour, tz),
        local_datetime(date, close_hour, tz),
    ) else {
        return Vec::new();
    };

    let now_local = now.with_timezone(&tz);
    let mut cursor = open;

    if date == now_local.date_naive() {
        let earliest = now_local + Duration::minutes(BOOKING_BUFFER_MINUTES);
        while cursor < earliest {
            cursor += Duration::minutes(duration_minutes);
        }
    }

    let mut slots = Vec::new();
    while cursor + Duration::minutes(duration_minutes) <= close {
        let end = cursor + Duration::minutes(duration_minutes);
        slots.push(build_slot(cursor, end, duration_minutes, tz));
        cursor = end;
    }

    slots
}

/// Drop every slot that overlaps a busy period. Half-open intervals on UTC
/// instants.
pub fn filter_free(slots: Vec<AvailableSlot>, busy: &[BusyPeriod]) -> Vec<AvailableSlot> {
    slots
        .into_iter()
        .filter(|slot| {
            let end = slot.datetime_utc + Duration::minutes(slot.duration_minutes);
            !busy.iter().any(|b| slot.datetime_utc < b.end && end > b.start)
        })
        .collect()
}

fn local_datetime(date: NaiveDate, hour: u32, tz: Tz) -> Option<DateTime<Tz>> {
    // `earliest` resolves DST ambiguity; a nonexistent local time (spring
    // gap) yields no slots for that boundary.
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive).earliest()
}

fn build_slot(
    start: DateTime<Tz>,
    end: DateTime<Tz>,
    duration_minutes: i64,
    tz: Tz,
) -> AvailableSlot {
    let formatted_date = start.format("%A, %B %d").to_string();
    let formatted_time_only = start.format("%I:%M %p").to_string();
    let timezone_abbr = timezone_abbreviation(&start, tz);

    AvailableSlot {
        start_time: start.format("%H:%M").to_string(),
        end_time: end.format("%H:%M").to_string(),
        datetime_utc: start.with_timezone(&Utc),
        datetime_local: start.fixed_offset(),
        formatted_time: format!("{} at {}", formatted_date, formatted_time_only),
        formatted_date,
        timezone_display: format!("{} {}", formatted_time_only, timezone_abbr),
        formatted_time_only,
        timezone: tz.name().to_string(),
        duration_minutes,
    }
}

pub(crate) fn timezone_abbreviation(at: &DateTime<Tz>, tz: Tz) -> String {
    let abbr = at.format("%Z").to_string();
    if abbr.is_empty() || abbr.starts_with('+') || abbr.starts_with('-') {
        tz.name().rsplit('/').next().unwrap_or("UTC").to_string()
    } else {
        abbr
    }
}
