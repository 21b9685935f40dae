//! Storefront Scheduler - opening hours, delivery windows and restaurant routing
//!
//! Answers two questions for every order attempt: which location should serve
//! the customer, and whether the order can be fulfilled now or must be
//! scheduled into a later delivery window.

pub mod config;
pub mod defaults;
pub mod logging;
pub mod services;
pub mod types;

pub use config::Config;
pub use services::delivery_planner::{plan_delivery_windows, DeliveryWindowPlanner};
pub use services::geo::haversine_distance;
pub use services::locator::{LocatorConfig, LocatorOutcome, RestaurantLocator, SelectionTier};
pub use services::opening_hours::is_open_at;
pub use services::schedule_parser::{parse_schedule, ScheduleError};
pub use services::scheduling::{decide, decide_for_schedule, DecisionTracker};
