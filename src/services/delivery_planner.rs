//! Delivery window planning
//!
//! Walks the next `horizon_days` calendar days (today first) and turns each
//! open day into the span during which an order can actually be handed over:
//! a buffer after opening, a buffer before closing, and for today nothing
//! earlier than `now + preparation time`.

use chrono::{DateTime, Datelike, Duration, FixedOffset};
use tracing::debug;

use crate::defaults::{CLOSING_BUFFER_MINUTES, OPENING_BUFFER_MINUTES, PLANNING_HORIZON_DAYS};
use crate::services::business_time::instant_at;
use crate::types::{DeliveryWindow, OpeningInterval, ScheduleMap, LAST_MINUTE_OF_DAY};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Delivery window planner
#[derive(Debug, Clone)]
pub struct DeliveryWindowPlanner {
    pub horizon_days: i64,
    pub opening_buffer_minutes: i64,
    pub closing_buffer_minutes: i64,
}

impl Default for DeliveryWindowPlanner {
    fn default() -> Self {
        Self {
            horizon_days: PLANNING_HORIZON_DAYS,
            opening_buffer_minutes: OPENING_BUFFER_MINUTES,
            closing_buffer_minutes: CLOSING_BUFFER_MINUTES,
        }
    }
}

impl DeliveryWindowPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Windows ordered by date, oldest first. Days that are closed, or whose
    /// remaining span is empty, are skipped.
    pub fn plan(
        &self,
        schedule: &ScheduleMap,
        now: &DateTime<FixedOffset>,
        preparation_minutes: i64,
    ) -> Vec<DeliveryWindow> {
        let today = now.date_naive();
        let earliest_ready = *now + Duration::minutes(preparation_minutes);
        let mut windows = Vec::new();

        for day_offset in 0..self.horizon_days {
            let date = today + Duration::days(day_offset);
            let weekday = date.weekday();
            let Some(interval) = schedule.get(weekday) else {
                continue;
            };

            let (start_minute, end_minute) = self.window_minutes(interval);
            let mut start = instant_at(date, start_minute);
            let end = instant_at(date, end_minute);

            if day_offset == 0 && earliest_ready > start {
                start = earliest_ready;
            }

            if end <= start {
                debug!("No deliverable span left on {} ({})", date, weekday);
                continue;
            }

            windows.push(DeliveryWindow {
                date,
                weekday,
                start,
                end,
                is_today: day_offset == 0,
                is_tomorrow: day_offset == 1,
            });
        }

        windows
    }

    /// Window bounds as minutes from midnight of the opening day. An end past
    /// 1440 lands on the following calendar day.
    fn window_minutes(&self, interval: OpeningInterval) -> (i64, i64) {
        let open = i64::from(interval.open_minute);
        let close = i64::from(interval.close_minute);
        let start = open + self.opening_buffer_minutes;

        let end = if interval.open_minute == interval.close_minute {
            i64::from(LAST_MINUTE_OF_DAY)
        } else if interval.crosses_midnight() {
            MINUTES_PER_DAY + close - self.closing_buffer_minutes
        } else {
            close - self.closing_buffer_minutes
        };

        (start, end)
    }
}

/// Plan with the default buffers and 7-day horizon
pub fn plan_delivery_windows(
    schedule: &ScheduleMap,
    now: &DateTime<FixedOffset>,
    preparation_minutes: i64,
) -> Vec<DeliveryWindow> {
    DeliveryWindowPlanner::default().plan(schedule, now, preparation_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::business_time::{business_offset, format_time};
    use chrono::{NaiveDate, TimeZone, Weekday};

    /// 2026-10-12 is a Monday
    fn at(day_offset: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        business_offset()
            .with_ymd_and_hms(2026, 10, 12 + day_offset, hour, minute, 0)
            .unwrap()
    }

    fn every_day(open: (u32, u32), close: (u32, u32)) -> ScheduleMap {
        let interval = OpeningInterval::from_hm(open, close);
        ScheduleMap::from_intervals(
            [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]
            .map(|day| (day, interval)),
        )
    }

    #[test]
    fn test_same_day_window_applies_buffers() {
        let schedule = every_day((9, 0), (18, 0));
        let windows = plan_delivery_windows(&schedule, &at(0, 6, 0), 30);

        assert_eq!(windows.len(), 7);
        assert_eq!(format_time(&windows[0].start), "09:30");
        assert_eq!(format_time(&windows[0].end), "17:00");
        assert!(windows[0].is_today);
        assert!(windows[1].is_tomorrow);
        assert!(!windows[2].is_today && !windows[2].is_tomorrow);
    }

    #[test]
    fn test_today_starts_after_preparation() {
        let schedule = every_day((9, 0), (18, 0));
        let now = at(0, 12, 10);
        let windows = plan_delivery_windows(&schedule, &now, 45);

        assert_eq!(windows[0].start, now + Duration::minutes(45));
        assert!(windows[0].is_today);
    }

    #[test]
    fn test_today_dropped_when_too_late() {
        let schedule = every_day((9, 0), (18, 0));
        let windows = plan_delivery_windows(&schedule, &at(0, 16, 30), 60);

        assert!(!windows[0].is_today);
        assert_eq!(windows[0].date, NaiveDate::from_ymd_opt(2026, 10, 13).unwrap());
    }

    #[test]
    fn test_overnight_window_ends_next_day() {
        let schedule = ScheduleMap::from_intervals([(Weekday::Fri, OpeningInterval::from_hm((20, 0), (3, 0)))]);
        let windows = plan_delivery_windows(&schedule, &at(0, 10, 0), 30);

        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!(w.weekday, Weekday::Fri);
        assert_eq!(w.start, at(4, 20, 30));
        assert_eq!(w.end, at(5, 2, 0));
    }

    #[test]
    fn test_open_equals_close_runs_to_end_of_day() {
        let schedule = ScheduleMap::from_intervals([(Weekday::Tue, OpeningInterval::from_hm((6, 0), (6, 0)))]);
        let windows = plan_delivery_windows(&schedule, &at(0, 10, 0), 30);

        assert_eq!(format_time(&windows[0].start), "06:30");
        assert_eq!(format_time(&windows[0].end), "23:59");
    }

    #[test]
    fn test_full_day_schedule_yields_single_window() {
        let schedule = ScheduleMap::from_intervals([(Weekday::Wed, OpeningInterval::from_hm((0, 0), (23, 59)))]);
        let windows = plan_delivery_windows(&schedule, &at(1, 10, 0), 30);

        assert_eq!(windows.len(), 1);
        assert_eq!(format_time(&windows[0].start), "00:30");
        assert_eq!(format_time(&windows[0].end), "22:59");
    }

    #[test]
    fn test_closed_schedule_has_no_windows() {
        assert!(plan_delivery_windows(&ScheduleMap::closed(), &at(0, 10, 0), 30).is_empty());
    }

    #[test]
    fn test_windows_never_empty_and_sorted() {
        let schedules = [
            every_day((9, 0), (18, 0)),
            every_day((20, 0), (3, 0)),
            every_day((10, 0), (10, 45)),
            every_day((0, 0), (0, 30)),
            every_day((25, 0), (26, 0)),
        ];

        for schedule in &schedules {
            for hour in [0, 7, 12, 19, 23] {
                let now = at(0, hour, 15);
                let windows = plan_delivery_windows(schedule, &now, 30);
                for w in &windows {
                    assert!(w.end > w.start);
                    if w.is_today {
                        assert!(w.start >= now + Duration::minutes(30));
                    }
                }
                for pair in windows.windows(2) {
                    assert!(pair[0].date < pair[1].date);
                }
            }
        }
    }

    #[test]
    fn test_custom_buffers() {
        let planner = DeliveryWindowPlanner {
            horizon_days: 2,
            opening_buffer_minutes: 0,
            closing_buffer_minutes: 0,
        };
        let windows = planner.plan(&every_day((9, 0), (18, 0)), &at(0, 6, 0), 30);

        assert_eq!(windows.len(), 2);
        assert_eq!(format_time(&windows[0].start), "09:00");
        assert_eq!(format_time(&windows[0].end), "18:00");
    }
}
