//! Open-now evaluation

use chrono::{DateTime, Datelike, FixedOffset};

use crate::services::business_time::minute_of_day;
use crate::types::ScheduleMap;

/// Is the location open at `now` (already in the business offset)?
///
/// Only today's interval is consulted. An interval crossing midnight
/// (`close < open`) is open when `now >= open` OR `now <= close`.
pub fn is_open_at(schedule: &ScheduleMap, now: &DateTime<FixedOffset>) -> bool {
    let Some(interval) = schedule.get(now.weekday()) else {
        return false;
    };

    if interval.is_around_the_clock() {
        return true;
    }

    let current = minute_of_day(now);
    if interval.crosses_midnight() {
        current >= interval.open_minute || current <= interval.close_minute
    } else {
        current >= interval.open_minute && current <= interval.close_minute
    }
}
