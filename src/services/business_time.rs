//! Business clock helpers
//!
//! All scheduling runs in the fixed UTC+3 business offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Timelike, Utc};

use crate::defaults::BUSINESS_UTC_OFFSET_HOURS;

/// The business offset (UTC+3)
pub fn business_offset() -> FixedOffset {
    FixedOffset::east_opt(BUSINESS_UTC_OFFSET_HOURS * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

pub fn to_business_time(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&business_offset())
}

pub fn business_now() -> DateTime<FixedOffset> {
    to_business_time(Utc::now())
}

/// Minutes since midnight of the local wall clock
pub fn minute_of_day(instant: &DateTime<FixedOffset>) -> u32 {
    instant.hour() * 60 + instant.minute()
}

/// Instant at `minutes` past midnight of `date`. Minutes beyond a day roll
/// into the following date, which keeps degenerate schedule values usable.
pub fn instant_at(date: NaiveDate, minutes: i64) -> DateTime<FixedOffset> {
    let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is a valid time");
    // A fixed offset has no gaps or folds, so the UTC view is exact.
    let offset = business_offset();
    offset.from_utc_datetime(&(midnight - Duration::seconds(i64::from(offset.local_minus_utc()))))
        + Duration::minutes(minutes)
}

/// Format minutes since midnight as `HH:MM`
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Format the wall-clock time of an instant as `HH:MM`
pub fn format_time(instant: &DateTime<FixedOffset>) -> String {
    instant.format("%H:%M").to_string()
}
