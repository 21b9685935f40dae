//! Scheduling decision
//!
//! Combines open-now evaluation and delivery window planning into the single
//! value the ordering flow consumes. Decisions are recomputed on a timer and
//! on navigation; `DecisionTracker` drops results from superseded runs.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use parking_lot::Mutex;
use tracing::debug;

use crate::services::business_time::{format_minutes, instant_at};
use crate::services::delivery_planner::DeliveryWindowPlanner;
use crate::services::opening_hours::is_open_at;
use crate::types::{weekday_name, RestaurantProfile, ScheduleMap, SchedulingDecision};

/// Days scanned when looking for the next opening (a full week plus today)
const NEXT_OPENING_SCAN_DAYS: i64 = 8;

/// Decide for a restaurant at `now` (business offset)
pub fn decide(
    restaurant: &RestaurantProfile,
    now: &DateTime<FixedOffset>,
    preparation_minutes: i64,
) -> SchedulingDecision {
    decide_for_schedule(&restaurant.schedule, now, preparation_minutes)
}

pub fn decide_for_schedule(
    schedule: &ScheduleMap,
    now: &DateTime<FixedOffset>,
    preparation_minutes: i64,
) -> SchedulingDecision {
    let is_open_now = is_open_at(schedule, now);
    let available_windows = DeliveryWindowPlanner::default().plan(schedule, now, preparation_minutes);

    SchedulingDecision {
        needs_scheduling: !is_open_now || available_windows.is_empty(),
        is_open_now,
        can_fulfill_today: available_windows.iter().any(|w| w.is_today),
        next_opening_description: if is_open_now {
            None
        } else {
            next_opening_description(schedule, now)
        },
        earliest_window: available_windows.first().cloned(),
        available_windows,
    }
}

/// "Today at 10:00", "Tomorrow at 09:30" or "Friday at 11:00" for the first
/// opening strictly after `now`
pub fn next_opening_description(schedule: &ScheduleMap, now: &DateTime<FixedOffset>) -> Option<String> {
    let today = now.date_naive();

    (0..NEXT_OPENING_SCAN_DAYS).find_map(|day_offset| {
        let date = today + Duration::days(day_offset);
        let interval = schedule.get(date.weekday())?;
        let opening = instant_at(date, i64::from(interval.open_minute));
        if opening <= *now {
            return None;
        }
        let label = match day_offset {
            0 => "Today",
            1 => "Tomorrow",
            _ => weekday_name(date.weekday()),
        };
        Some(format!("{} at {}", label, format_minutes(interval.open_minute)))
    })
}

/// Identifies one decision computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionTicket {
    generation: u64,
    pub restaurant_id: String,
    pub requested_at: DateTime<FixedOffset>,
}

/// Keeps only the result of the most recently started computation
#[derive(Default)]
pub struct DecisionTracker {
    generation: AtomicU64,
    latest: Mutex<Option<SchedulingDecision>>,
}

impl DecisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a computation; any earlier ticket becomes stale
    pub fn begin(&self, restaurant_id: &str, now: DateTime<FixedOffset>) -> DecisionTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        DecisionTicket {
            generation,
            restaurant_id: restaurant_id.to_string(),
            requested_at: now,
        }
    }

    /// Apply a finished result. Returns false (and drops it) when a newer
    /// computation has started since `ticket` was issued.
    pub fn commit(&self, ticket: &DecisionTicket, decision: SchedulingDecision) -> bool {
        let mut latest = self.latest.lock();
        if ticket.generation != self.generation.load(Ordering::SeqCst) {
            debug!(
                "Discarding stale scheduling decision for {} requested at {}",
                ticket.restaurant_id, ticket.requested_at
            );
            return false;
        }
        *latest = Some(decision);
        true
    }

    pub fn current(&self) -> Option<SchedulingDecision> {
        self.latest.lock().clone()
    }
}
