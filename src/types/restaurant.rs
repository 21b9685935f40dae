//! Restaurant (serving location) types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Coordinates, ScheduleMap};
use crate::services::schedule_parser::parse_schedule;

/// Serving location as seen by scheduling and routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    /// Some locations only carry a city name
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub schedule: ScheduleMap,
}

/// Column order of the legacy positional restaurant row
const LEGACY_ID: usize = 0;
const LEGACY_NAME: usize = 1;
const LEGACY_ADDRESS: usize = 2;
const LEGACY_CITY: usize = 3;
const LEGACY_LAT: usize = 4;
const LEGACY_LNG: usize = 5;
const LEGACY_SCHEDULE: usize = 6;

impl RestaurantProfile {
    /// Convert a catalog row into a profile.
    ///
    /// Accepts both the named-field object and the legacy positional array
    /// `[id, name, address, city, latitude, longitude, schedule]`. This is the
    /// only place positional access happens. Rows without an id yield `None`.
    pub fn from_legacy(row: &Value) -> Option<Self> {
        match row {
            Value::Array(cols) => {
                let id = value_as_id(cols.get(LEGACY_ID)?)?;
                let lat = cols.get(LEGACY_LAT).and_then(value_as_f64);
                let lng = cols.get(LEGACY_LNG).and_then(value_as_f64);
                Some(Self {
                    id,
                    name: cols.get(LEGACY_NAME).map(value_as_text).unwrap_or_default(),
                    address: cols.get(LEGACY_ADDRESS).map(value_as_text).unwrap_or_default(),
                    city: cols.get(LEGACY_CITY).map(value_as_text).unwrap_or_default(),
                    coordinates: coordinates_from(lat, lng),
                    schedule: cols
                        .get(LEGACY_SCHEDULE)
                        .map(parse_schedule)
                        .unwrap_or_default(),
                })
            }
            Value::Object(fields) => {
                let id = value_as_id(fields.get("id")?)?;
                let lat = fields
                    .get("latitude")
                    .or_else(|| fields.get("lat"))
                    .and_then(value_as_f64);
                let lng = fields
                    .get("longitude")
                    .or_else(|| fields.get("lng"))
                    .and_then(value_as_f64);
                let nested = fields
                    .get("coordinates")
                    .and_then(|c| serde_json::from_value::<Coordinates>(c.clone()).ok());
                Some(Self {
                    id,
                    name: fields.get("name").map(value_as_text).unwrap_or_default(),
                    address: fields.get("address").map(value_as_text).unwrap_or_default(),
                    city: fields.get("city").map(value_as_text).unwrap_or_default(),
                    coordinates: nested.or_else(|| coordinates_from(lat, lng)),
                    schedule: fields
                        .get("schedule")
                        .or_else(|| fields.get("working_hours"))
                        .map(parse_schedule)
                        .unwrap_or_default(),
                })
            }
            _ => None,
        }
    }

    /// Minimal projection persisted as the customer's selected restaurant
    pub fn to_selected(&self) -> SelectedRestaurant {
        SelectedRestaurant {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            coordinates: self.coordinates,
        }
    }
}

fn coordinates_from(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
            Some(Coordinates { lat, lng })
        }
        _ => None,
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numbers, or numeric strings; blank strings are treated as missing
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Cached projection of the chosen restaurant (`selectedRestaurant` entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedRestaurant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl SelectedRestaurant {
    /// Expand back into a profile. The projection carries no schedule, so the
    /// caller supplies one (usually from the matching catalog entry).
    pub fn into_profile(self, schedule: ScheduleMap) -> RestaurantProfile {
        RestaurantProfile {
            id: self.id,
            name: self.name,
            address: self.address,
            city: self.city,
            coordinates: self.coordinates,
            schedule,
        }
    }
}

/// Inputs for choosing a serving location
#[derive(Debug, Clone, Default)]
pub struct SelectionContext {
    pub cached_restaurant_id: Option<String>,
    pub user_coordinates: Option<Coordinates>,
    pub user_city: Option<String>,
    /// Client IP used for geolocation when no coordinates are known
    pub client_ip: Option<String>,
    pub candidates: Vec<RestaurantProfile>,
}
