//! Tolerant opening-hours parser
//!
//! Schedules arrive either as a JSON object (`{"Monday": "09:00-18:00"}`) or as a
//! string written with Python literal syntax (`{'Monday': '09:00-18:00', 'Sunday': None}`).
//! Anything that cannot be decoded is treated as closed all week. Schedule data
//! only drives display and gating, so a bad value must never fail an order flow.

use chrono::Weekday;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::{OpeningInterval, ScheduleMap};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule could not be decoded: {0}")]
    Decode(String),
    #[error("schedule is not a weekday map")]
    NotAMap,
    #[error("invalid interval '{0}', expected HH:MM-HH:MM")]
    InvalidInterval(String),
    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
}

/// Parse a schedule, degrading to "closed all week" on any decode failure.
pub fn parse_schedule(raw: &Value) -> ScheduleMap {
    match try_parse_schedule(raw) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!("Unparseable schedule treated as closed: {}", e);
            ScheduleMap::closed()
        }
    }
}

/// Strict variant: surfaces whole-document failures. Individual days with a
/// bad interval are still closed rather than failing the document.
pub fn try_parse_schedule(raw: &Value) -> Result<ScheduleMap, ScheduleError> {
    match raw {
        Value::Object(days) => Ok(schedule_from_map(days)),
        Value::String(text) => {
            let normalized = python_literal_to_json(text);
            let decoded: Value = serde_json::from_str(&normalized)
                .map_err(|e| ScheduleError::Decode(e.to_string()))?;
            match decoded {
                Value::Object(days) => Ok(schedule_from_map(&days)),
                _ => Err(ScheduleError::NotAMap),
            }
        }
        Value::Null => Ok(ScheduleMap::closed()),
        _ => Err(ScheduleError::NotAMap),
    }
}

fn schedule_from_map(days: &Map<String, Value>) -> ScheduleMap {
    let mut schedule = ScheduleMap::closed();

    for (key, value) in days {
        let Some(weekday) = parse_weekday(key) else {
            debug!("Ignoring unknown schedule key '{}'", key);
            continue;
        };

        let interval = match value {
            Value::String(text) => match parse_interval(text) {
                Ok(interval) => Some(interval),
                Err(e) => {
                    debug!("{} closed: {}", key, e);
                    None
                }
            },
            _ => None,
        };

        schedule.set(weekday, interval);
    }

    schedule
}

/// Full English names or abbreviations of at least three letters ("Tue",
/// "Thurs", "Mon."), any case
fn parse_weekday(key: &str) -> Option<Weekday> {
    let key = key.trim().trim_end_matches('.').to_lowercase();
    let day = match key.get(..3)? {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return None,
    };
    // Reject things like "month" that merely share a prefix
    let full = crate::types::weekday_name(day).to_lowercase();
    full.starts_with(&key).then_some(day)
}

/// Split `HH:MM-HH:MM` into minute-of-day values. Ranges are not validated.
pub fn parse_interval(text: &str) -> Result<OpeningInterval, ScheduleError> {
    let (open, close) = text
        .split_once('-')
        .ok_or_else(|| ScheduleError::InvalidInterval(text.to_string()))?;
    Ok(OpeningInterval::new(parse_time(open)?, parse_time(close)?))
}

fn parse_time(text: &str) -> Result<u32, ScheduleError> {
    let text = text.trim();
    let (hours, minutes) = text
        .split_once(':')
        .ok_or_else(|| ScheduleError::InvalidTime(text.to_string()))?;
    let hours: u32 = hours
        .trim()
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(text.to_string()))?;
    let minutes: u32 = minutes
        .trim()
        .parse()
        .map_err(|_| ScheduleError::InvalidTime(text.to_string()))?;
    hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .ok_or_else(|| ScheduleError::InvalidTime(text.to_string()))
}

/// Rewrite Python literal syntax into JSON: quotes, then `None`/`True`/`False`
/// as whole words only.
fn python_literal_to_json(text: &str) -> String {
    let quoted = text.replace('\'', "\"");
    let mut out = String::with_capacity(quoted.len());
    let mut word = String::new();

    for ch in quoted.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }
        flush_word(&mut out, &mut word);
        out.push(ch);
    }
    flush_word(&mut out, &mut word);

    out
}

fn flush_word(out: &mut String, word: &mut String) {
    match word.as_str() {
        "None" => out.push_str("null"),
        "True" => out.push_str("true"),
        "False" => out.push_str("false"),
        other => out.push_str(other),
    }
    word.clear();
}
