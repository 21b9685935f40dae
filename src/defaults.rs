//! Business constants shared by scheduling and routing

/// The business runs on a single fixed UTC+3 offset
pub const BUSINESS_UTC_OFFSET_HOURS: i32 = 3;

/// Delivery can start this long after the location opens
pub const OPENING_BUFFER_MINUTES: i64 = 30;

/// Last delivery is this long before the location closes
pub const CLOSING_BUFFER_MINUTES: i64 = 60;

/// Number of days (starting today) offered for scheduling
pub const PLANNING_HORIZON_DAYS: i64 = 7;

pub const DEFAULT_SLOT_MINUTES: i64 = 30;

/// Preparation time shown by the customer-facing banner
pub const BANNER_PREPARATION_MINUTES: i64 = 30;

/// Preparation time used by the checkout flow
pub const CHECKOUT_PREPARATION_MINUTES: i64 = 60;

/// Proximity search radius in kilometers
pub const SEARCH_RADIUS_KM: f64 = 20.0;

/// Distance assumed for a same-city location without coordinates
pub const SAME_CITY_ASSUMED_KM: f64 = 3.0;

/// Beyond this distance a same-city location without coordinates wins
pub const SAME_CITY_OVERRIDE_KM: f64 = 5.0;

/// Location served when nothing better is known
pub const DEFAULT_RESTAURANT_ID: &str = "1";

/// Geolocation lookups are reused for 24 hours
pub const GEOLOCATION_TTL_SECS: u64 = 24 * 60 * 60;

pub const GEOLOCATION_TIMEOUT_MS: u64 = 3000;
