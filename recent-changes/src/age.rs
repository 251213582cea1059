use crate::types::{ChangesError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Number of full days elapsed from `subject` to `reference`.
///
/// Counts calendar days between the two local dates, then drops the last one
/// when it is not complete. Truncates toward zero, so a subject in the future
/// gives a negative age.
pub fn age_in_days<Tz: TimeZone>(reference: &DateTime<Tz>, subject: &DateTime<Tz>) -> i64 {
    let later = reference.naive_local();
    let earlier = subject.naive_local();

    let calendar_days = later.date().signed_duration_since(earlier.date()).num_days();

    if calendar_days > 0 && later.time() < earlier.time() {
        calendar_days - 1
    } else if calendar_days < 0 && later.time() > earlier.time() {
        calendar_days + 1
    } else {
        calendar_days
    }
}

/// Age of a raw API timestamp relative to `reference`, in `reference`'s zone.
pub fn age_of_timestamp<Tz: TimeZone>(reference: &DateTime<Tz>, raw: &str) -> Result<i64> {
    let subject = parse_timestamp(raw)?.with_timezone(&reference.timezone());
    Ok(age_in_days(reference, &subject))
}

/// Parse the timestamp formats the metadata API emits.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    Err(ChangesError::Timestamp(raw.to_string()))
}
