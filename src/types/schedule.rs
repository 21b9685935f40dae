//! Opening-hours types

use chrono::Weekday;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::services::business_time::format_minutes;
use crate::services::schedule_parser::parse_schedule;

/// Last minute of a day (23:59)
pub const LAST_MINUTE_OF_DAY: u32 = 23 * 60 + 59;

/// A single day's operating interval in minutes since midnight.
///
/// Values come straight from the schedule source and are not range checked,
/// so consumers must tolerate `open`/`close` beyond 23:59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningInterval {
    pub open_minute: u32,
    pub close_minute: u32,
}

impl OpeningInterval {
    pub fn new(open_minute: u32, close_minute: u32) -> Self {
        Self {
            open_minute,
            close_minute,
        }
    }

    /// Build from hours and minutes, e.g. `from_hm((10, 0), (3, 0))`
    pub fn from_hm(open: (u32, u32), close: (u32, u32)) -> Self {
        Self::new(open.0 * 60 + open.1, close.0 * 60 + close.1)
    }

    /// Open around the clock: `open == close`, or 00:00-23:59
    pub fn is_around_the_clock(&self) -> bool {
        self.open_minute == self.close_minute
            || (self.open_minute == 0 && self.close_minute == LAST_MINUTE_OF_DAY)
    }

    /// Closing time falls on the next calendar day (e.g. 20:00-03:00)
    pub fn crosses_midnight(&self) -> bool {
        self.close_minute < self.open_minute
    }
}

/// Weekly opening hours, Monday first. `None` means closed that day.
///
/// Serialises to the wire shape `{"Monday": "09:00-18:00", "Tuesday": null, ...}`
/// and deserialises through the tolerant schedule parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleMap {
    days: [Option<OpeningInterval>; 7],
}

impl ScheduleMap {
    /// Closed all week
    pub fn closed() -> Self {
        Self::default()
    }

    pub fn from_intervals<I>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (Weekday, OpeningInterval)>,
    {
        let mut schedule = Self::default();
        for (weekday, interval) in intervals {
            schedule.set(weekday, Some(interval));
        }
        schedule
    }

    pub fn get(&self, weekday: Weekday) -> Option<OpeningInterval> {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, weekday: Weekday, interval: Option<OpeningInterval>) {
        self.days[weekday.num_days_from_monday() as usize] = interval;
    }

    pub fn is_closed_all_week(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// Iterate `(weekday, interval)` for open days, Monday first
    pub fn open_days(&self) -> impl Iterator<Item = (Weekday, OpeningInterval)> + '_ {
        self.days.iter().enumerate().filter_map(|(idx, day)| {
            day.map(|interval| (weekday_from_index(idx), interval))
        })
    }
}

impl Serialize for ScheduleMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(7))?;
        for (idx, day) in self.days.iter().enumerate() {
            let value = day.map(|interval| {
                format!(
                    "{}-{}",
                    format_minutes(interval.open_minute),
                    format_minutes(interval.close_minute)
                )
            });
            map.serialize_entry(weekday_name(weekday_from_index(idx)), &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ScheduleMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(parse_schedule(&raw))
    }
}

fn weekday_from_index(idx: usize) -> Weekday {
    match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// English weekday name used on the wire and in display strings
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
