//! Delivery window, slot and scheduling decision types

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::weekday_name;
use crate::services::business_time::format_time;

/// Contiguous span on one calendar day during which an order can be fulfilled.
/// Invariant: `end > start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryWindow {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub is_today: bool,
    pub is_tomorrow: bool,
}

impl DeliveryWindow {
    /// Split the window into fixed-size slots. A trailing partial slot
    /// that would run past `end` is dropped.
    pub fn slots(&self, slot_minutes: i64) -> Vec<TimeSlot> {
        if slot_minutes <= 0 {
            return Vec::new();
        }
        let step = Duration::minutes(slot_minutes);
        let mut slots = Vec::new();
        let mut cursor = self.start;
        while cursor + step <= self.end {
            slots.push(TimeSlot {
                start: cursor,
                end: cursor + step,
            });
            cursor = cursor + step;
        }
        slots
    }

    /// "Today", "Tomorrow" or the weekday name
    pub fn day_label(&self) -> &'static str {
        if self.is_today {
            "Today"
        } else if self.is_tomorrow {
            "Tomorrow"
        } else {
            weekday_name(self.weekday)
        }
    }
}

/// Fixed-size subdivision of a delivery window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

/// Everything the ordering flow needs to decide "now or later"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingDecision {
    pub needs_scheduling: bool,
    pub is_open_now: bool,
    pub available_windows: Vec<DeliveryWindow>,
    /// "Today/Tomorrow/<Weekday> at HH:MM"; `None` while the location is open
    /// or when no opening falls within the next week
    pub next_opening_description: Option<String>,
    pub can_fulfill_today: bool,
    pub earliest_window: Option<DeliveryWindow>,
}

/// Payload handed to the booking UI when a day/time is picked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSelection {
    /// `YYYY-MM-DD`
    pub date: String,
    pub day_name: String,
    pub time_slot: SelectedTimeSlot,
    pub is_scheduled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTimeSlot {
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`
    pub end: String,
    /// RFC 3339 instant of the slot start
    pub value: String,
}

impl ScheduleSelection {
    pub fn new(window: &DeliveryWindow, slot: &TimeSlot) -> Self {
        Self {
            date: window.date.format("%Y-%m-%d").to_string(),
            day_name: window.day_label().to_string(),
            time_slot: SelectedTimeSlot {
                start: format_time(&slot.start),
                end: format_time(&slot.end),
                value: slot.start.to_rfc3339(),
            },
            is_scheduled: true,
        }
    }

    /// First slot of the earliest window, used when the system picks for the customer
    pub fn auto_select(decision: &SchedulingDecision, slot_minutes: i64) -> Option<Self> {
        decision.available_windows.iter().find_map(|window| {
            window
                .slots(slot_minutes)
                .first()
                .map(|slot| Self::new(window, slot))
        })
    }
}
