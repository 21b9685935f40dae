//! Restaurant locator
//!
//! Picks the location that serves a customer. Selection runs through a fixed
//! list of tiers, each more permissive than the last; the first tier that
//! produces a location wins:
//!
//! 1. `Cached` - the customer's previously selected restaurant
//! 2. `NearestOpen` - nearest open location within the search radius
//! 3. `NearestAny` - nearest location within the radius, open or not
//! 4. `Default` - the configured default location, else the first candidate
//!
//! Locations without coordinates in the customer's city are ranked at an
//! assumed distance, so a city match still counts as proximity.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::defaults::{
    DEFAULT_RESTAURANT_ID, GEOLOCATION_TIMEOUT_MS, SAME_CITY_ASSUMED_KM, SAME_CITY_OVERRIDE_KM,
    SEARCH_RADIUS_KM,
};
use crate::services::cache::{get_json, set_json, KeyValueStore, SELECTED_RESTAURANT_KEY};
use crate::services::city::normalize_city;
use crate::services::geo::haversine_distance;
use crate::services::geolocation::Geolocator;
use crate::services::opening_hours::is_open_at;
use crate::types::{
    RestaurantProfile, ScheduleMap, SelectedRestaurant, SelectionContext, UserLocation,
};

/// Locator tuning
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub search_radius_km: f64,
    pub same_city_assumed_km: f64,
    pub same_city_override_km: f64,
    pub default_restaurant_id: String,
    pub geolocation_timeout: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            search_radius_km: SEARCH_RADIUS_KM,
            same_city_assumed_km: SAME_CITY_ASSUMED_KM,
            same_city_override_km: SAME_CITY_OVERRIDE_KM,
            default_restaurant_id: DEFAULT_RESTAURANT_ID.to_string(),
            geolocation_timeout: Duration::from_millis(GEOLOCATION_TIMEOUT_MS),
        }
    }
}

impl From<&Config> for LocatorConfig {
    fn from(config: &Config) -> Self {
        Self {
            search_radius_km: config.search_radius_km,
            default_restaurant_id: config.default_restaurant_id.clone(),
            geolocation_timeout: config.geolocation_timeout,
            ..Self::default()
        }
    }
}

/// Fallback tiers in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTier {
    Cached,
    NearestOpen,
    NearestAny,
    Default,
}

impl SelectionTier {
    pub const ORDER: [SelectionTier; 4] = [
        SelectionTier::Cached,
        SelectionTier::NearestOpen,
        SelectionTier::NearestAny,
        SelectionTier::Default,
    ];
}

/// The chosen restaurant and how it was chosen
#[derive(Debug, Clone, PartialEq)]
pub struct LocatorOutcome {
    pub restaurant: RestaurantProfile,
    pub tier: SelectionTier,
    /// Real or assumed distance for the proximity tiers
    pub distance_km: Option<f64>,
}

/// A candidate annotated with its distance from the customer
#[derive(Debug, Clone, Copy)]
struct RankedCandidate<'a> {
    restaurant: &'a RestaurantProfile,
    distance_km: f64,
    /// Same-city location without coordinates
    assumed: bool,
}

/// Restaurant locator
pub struct RestaurantLocator {
    config: LocatorConfig,
    store: Arc<dyn KeyValueStore>,
    geolocator: Option<Arc<dyn Geolocator>>,
}

impl RestaurantLocator {
    pub fn new(config: LocatorConfig, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            config,
            store,
            geolocator: None,
        }
    }

    /// Use `geolocator` when the context carries no coordinates
    pub fn with_geolocator(mut self, geolocator: Arc<dyn Geolocator>) -> Self {
        self.geolocator = Some(geolocator);
        self
    }

    /// Choose a restaurant. `None` only when there are no candidates.
    pub async fn locate(
        &self,
        ctx: &SelectionContext,
        now: &DateTime<FixedOffset>,
    ) -> Option<LocatorOutcome> {
        if ctx.candidates.is_empty() {
            debug!("No candidate restaurants, nothing to select");
            return None;
        }

        // Tier 1 needs no position, so try it before any network call
        let no_position = UserLocation::default();
        if let Some(outcome) = self.run_tiers(&SelectionTier::ORDER[..1], ctx, &no_position, now) {
            return Some(outcome);
        }

        let user = self.resolve_user_location(ctx).await;
        self.run_tiers(&SelectionTier::ORDER[1..], ctx, &user, now)
    }

    /// Synchronous selection with a known customer position
    pub fn select(
        &self,
        ctx: &SelectionContext,
        user: &UserLocation,
        now: &DateTime<FixedOffset>,
    ) -> Option<LocatorOutcome> {
        if ctx.candidates.is_empty() {
            return None;
        }
        self.run_tiers(&SelectionTier::ORDER, ctx, user, now)
    }

    /// Persist the chosen restaurant as the `selectedRestaurant` entry
    pub fn remember_selection(&self, restaurant: &RestaurantProfile) {
        set_json(self.store.as_ref(), SELECTED_RESTAURANT_KEY, &restaurant.to_selected(), None);
    }

    pub fn forget_selection(&self) {
        self.store.remove(SELECTED_RESTAURANT_KEY);
    }

    fn run_tiers(
        &self,
        tiers: &[SelectionTier],
        ctx: &SelectionContext,
        user: &UserLocation,
        now: &DateTime<FixedOffset>,
    ) -> Option<LocatorOutcome> {
        let outcome = tiers
            .iter()
            .find_map(|tier| self.try_tier(*tier, ctx, user, now))?;
        info!(
            "Selected restaurant {} via {:?} tier (distance {:?} km)",
            outcome.restaurant.id, outcome.tier, outcome.distance_km
        );
        Some(outcome)
    }

    fn try_tier(
        &self,
        tier: SelectionTier,
        ctx: &SelectionContext,
        user: &UserLocation,
        now: &DateTime<FixedOffset>,
    ) -> Option<LocatorOutcome> {
        match tier {
            SelectionTier::Cached => self.cached_selection(ctx),
            SelectionTier::NearestOpen => {
                let open = ctx
                    .candidates
                    .iter()
                    .filter(|candidate| is_open_at(&candidate.schedule, now));
                self.nearest(open, user, tier)
            }
            SelectionTier::NearestAny => self.nearest(ctx.candidates.iter(), user, tier),
            SelectionTier::Default => {
                let restaurant = ctx
                    .candidates
                    .iter()
                    .find(|candidate| candidate.id == self.config.default_restaurant_id)
                    .or_else(|| ctx.candidates.first())?;
                Some(LocatorOutcome {
                    restaurant: restaurant.clone(),
                    tier,
                    distance_km: None,
                })
            }
        }
    }

    /// Returned without checking it against the current catalog; the schedule
    /// is borrowed from the matching candidate when there is one.
    fn cached_selection(&self, ctx: &SelectionContext) -> Option<LocatorOutcome> {
        let cached_id = ctx.cached_restaurant_id.as_deref()?;
        let selected: SelectedRestaurant = get_json(self.store.as_ref(), SELECTED_RESTAURANT_KEY)?;
        if selected.id != cached_id {
            debug!("Cached restaurant {} does not match id {}", selected.id, cached_id);
            return None;
        }

        let schedule = ctx
            .candidates
            .iter()
            .find(|candidate| candidate.id == selected.id)
            .map(|candidate| candidate.schedule.clone())
            .unwrap_or_else(ScheduleMap::closed);

        Some(LocatorOutcome {
            restaurant: selected.into_profile(schedule),
            tier: SelectionTier::Cached,
            distance_km: None,
        })
    }

    fn nearest<'a, I>(
        &self,
        candidates: I,
        user: &UserLocation,
        tier: SelectionTier,
    ) -> Option<LocatorOutcome>
    where
        I: Iterator<Item = &'a RestaurantProfile>,
    {
        let ranked = self.rank(candidates, user)?;
        let chosen = self.pick(&ranked)?;
        Some(LocatorOutcome {
            restaurant: chosen.restaurant.clone(),
            tier,
            distance_km: Some(chosen.distance_km),
        })
    }

    /// Distance-annotated candidates, nearest first. Requires coordinates.
    fn rank<'a, I>(&self, candidates: I, user: &UserLocation) -> Option<Vec<RankedCandidate<'a>>>
    where
        I: Iterator<Item = &'a RestaurantProfile>,
    {
        let origin = user.coordinates?;
        let user_city = user
            .city
            .as_deref()
            .map(normalize_city)
            .filter(|city| !city.is_empty());

        let mut ranked: Vec<RankedCandidate<'a>> = candidates
            .filter_map(|restaurant| match restaurant.coordinates {
                Some(coords) => Some(RankedCandidate {
                    restaurant,
                    distance_km: haversine_distance(&origin, &coords),
                    assumed: false,
                }),
                None => {
                    let same_city = user_city
                        .as_deref()
                        .is_some_and(|city| normalize_city(&restaurant.city) == city);
                    same_city.then_some(RankedCandidate {
                        restaurant,
                        distance_km: self.config.same_city_assumed_km,
                        assumed: true,
                    })
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.distance_km
                .partial_cmp(&b.distance_km)
                .unwrap_or(Ordering::Equal)
        });
        Some(ranked)
    }

    /// Nearest candidate, unless it is a distant exact match and a same-city
    /// location without coordinates exists. Must be within the radius.
    fn pick<'a>(&self, ranked: &[RankedCandidate<'a>]) -> Option<RankedCandidate<'a>> {
        let nearest = *ranked.first()?;
        let chosen = if !nearest.assumed && nearest.distance_km > self.config.same_city_override_km {
            ranked
                .iter()
                .copied()
                .find(|candidate| candidate.assumed)
                .unwrap_or(nearest)
        } else {
            nearest
        };

        (chosen.distance_km <= self.config.search_radius_km).then_some(chosen)
    }

    /// Context coordinates first, then the geolocation collaborator. A slow
    /// or failing lookup yields no position rather than an error.
    async fn resolve_user_location(&self, ctx: &SelectionContext) -> UserLocation {
        if ctx.user_coordinates.is_some() {
            return UserLocation {
                coordinates: ctx.user_coordinates,
                city: ctx.user_city.clone(),
            };
        }

        let fallback = UserLocation {
            coordinates: None,
            city: ctx.user_city.clone(),
        };
        let Some(geolocator) = &self.geolocator else {
            return fallback;
        };

        let lookup = geolocator.locate(ctx.client_ip.as_deref());
        match tokio::time::timeout(self.config.geolocation_timeout, lookup).await {
            Ok(Ok(Some(found))) => UserLocation {
                coordinates: Some(found.coordinates),
                city: ctx.user_city.clone().or(found.city),
            },
            Ok(Ok(None)) => {
                debug!("Geolocation via {} found nothing", geolocator.name());
                fallback
            }
            Ok(Err(e)) => {
                warn!("Geolocation via {} failed, skipping proximity search: {}", geolocator.name(), e);
                fallback
            }
            Err(_) => {
                warn!(
                    "Geolocation via {} timed out after {:?}, skipping proximity search",
                    geolocator.name(),
                    self.config.geolocation_timeout
                );
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::business_time::business_offset;
    use crate::services::cache::InMemoryStore;
    use crate::services::geolocation::MockGeolocator;
    use crate::types::{Coordinates, OpeningInterval};
    use chrono::{TimeZone, Weekday};

    const VARNA: Coordinates = Coordinates { lat: 43.2141, lng: 27.9147 };

    /// Monday noon
    fn now() -> DateTime<FixedOffset> {
        business_offset().with_ymd_and_hms(2026, 10, 12, 12, 0, 0).unwrap()
    }

    fn open_all_week() -> ScheduleMap {
        let interval = OpeningInterval::from_hm((0, 0), (23, 59));
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

    /// `north_km` kilometers north of Varna center
    fn north_of_varna(north_km: f64) -> Coordinates {
        Coordinates {
            lat: VARNA.lat + north_km / 111.195,
            lng: VARNA.lng,
        }
    }

    fn restaurant(id: &str, city: &str, coordinates: Option<Coordinates>, open: bool) -> RestaurantProfile {
        RestaurantProfile {
            id: id.to_string(),
            name: format!("Restaurant {}", id),
            address: String::new(),
            city: city.to_string(),
            coordinates,
            schedule: if open { open_all_week() } else { ScheduleMap::closed() },
        }
    }

    fn locator() -> RestaurantLocator {
        RestaurantLocator::new(LocatorConfig::default(), Arc::new(InMemoryStore::new()))
    }

    fn context(candidates: Vec<RestaurantProfile>) -> SelectionContext {
        SelectionContext {
            user_coordinates: Some(VARNA),
            user_city: Some("Varna".to_string()),
            candidates,
            ..SelectionContext::default()
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_yield_none() {
        assert!(locator().locate(&context(vec![]), &now()).await.is_none());
    }

    #[tokio::test]
    async fn test_cached_selection_wins_over_closer_open_candidate() {
        let locator = locator();
        let far = restaurant("far", "Burgas", Some(Coordinates { lat: 42.5048, lng: 27.4626 }), true);
        locator.remember_selection(&far);

        let mut ctx = context(vec![
            restaurant("near", "Varna", Some(north_of_varna(1.0)), true),
            far.clone(),
        ]);
        ctx.cached_restaurant_id = Some("far".to_string());

        let outcome = locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::Cached);
        assert_eq!(outcome.restaurant.id, "far");
        assert_eq!(outcome.restaurant.schedule, far.schedule);
    }

    #[tokio::test]
    async fn test_cached_selection_not_in_catalog_still_returned() {
        let locator = locator();
        locator.remember_selection(&restaurant("gone", "Varna", None, true));

        let mut ctx = context(vec![restaurant("near", "Varna", Some(north_of_varna(1.0)), true)]);
        ctx.cached_restaurant_id = Some("gone".to_string());

        let outcome = locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.restaurant.id, "gone");
        assert!(outcome.restaurant.schedule.is_closed_all_week());
    }

    #[tokio::test]
    async fn test_unresolvable_cache_falls_through() {
        let store = Arc::new(InMemoryStore::new());
        store.set(SELECTED_RESTAURANT_KEY, "{broken".to_string(), None);
        let locator = RestaurantLocator::new(LocatorConfig::default(), store);

        let mut ctx = context(vec![restaurant("near", "Varna", Some(north_of_varna(1.0)), true)]);
        ctx.cached_restaurant_id = Some("near".to_string());

        let outcome = locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::NearestOpen);

        locator.forget_selection();
        assert!(locator.store.get(SELECTED_RESTAURANT_KEY).is_none());
    }

    #[tokio::test]
    async fn test_nearest_open_preferred_over_nearer_closed() {
        let ctx = context(vec![
            restaurant("closed", "Varna", Some(north_of_varna(0.5)), false),
            restaurant("open", "Varna", Some(north_of_varna(4.0)), true),
        ]);

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::NearestOpen);
        assert_eq!(outcome.restaurant.id, "open");
        assert!((outcome.distance_km.unwrap() - 4.0).abs() < 0.05);
    }

    #[tokio::test]
    async fn test_all_closed_falls_back_to_nearest_any() {
        let ctx = context(vec![
            restaurant("closed-far", "Varna", Some(north_of_varna(10.0)), false),
            restaurant("closed-near", "Varna", Some(north_of_varna(2.0)), false),
        ]);

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::NearestAny);
        assert_eq!(outcome.restaurant.id, "closed-near");
    }

    #[tokio::test]
    async fn test_cyrillic_user_city_matches_latin_candidate() {
        let mut ctx = context(vec![
            restaurant("sofia", "Sofia", Some(Coordinates { lat: 42.6977, lng: 23.3219 }), true),
            restaurant("varna", "Varna", None, true),
        ]);
        ctx.user_city = Some("Варна".to_string());

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.restaurant.id, "varna");
        assert_eq!(outcome.tier, SelectionTier::NearestOpen);
        assert_eq!(outcome.distance_km, Some(SAME_CITY_ASSUMED_KM));
    }

    #[tokio::test]
    async fn test_same_city_without_coordinates_beats_distant_exact_match() {
        let ctx = context(vec![
            restaurant("exact", "Aksakovo", Some(north_of_varna(25.0)), true),
            restaurant("same-city", "Varna", None, true),
        ]);

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.restaurant.id, "same-city");
    }

    #[test]
    fn test_same_city_override_applies_to_distant_nearest() {
        let config = LocatorConfig {
            same_city_assumed_km: 8.0,
            ..LocatorConfig::default()
        };
        let locator = RestaurantLocator::new(config, Arc::new(InMemoryStore::new()));
        let ctx = context(vec![
            restaurant("exact", "Aksakovo", Some(north_of_varna(6.0)), true),
            restaurant("same-city", "Varna", None, true),
        ]);
        let user = UserLocation {
            coordinates: Some(VARNA),
            city: Some("Varna".to_string()),
        };

        let outcome = locator.select(&ctx, &user, &now()).unwrap();
        assert_eq!(outcome.restaurant.id, "same-city");
    }

    #[tokio::test]
    async fn test_outside_radius_uses_default_id() {
        let ctx = context(vec![
            restaurant("a", "Burgas", Some(north_of_varna(-90.0)), true),
            restaurant(DEFAULT_RESTAURANT_ID, "Sofia", Some(Coordinates { lat: 42.6977, lng: 23.3219 }), true),
        ]);

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::Default);
        assert_eq!(outcome.restaurant.id, DEFAULT_RESTAURANT_ID);
    }

    #[tokio::test]
    async fn test_no_position_and_no_default_uses_first_candidate() {
        let ctx = SelectionContext {
            candidates: vec![
                restaurant("first", "Varna", None, true),
                restaurant("second", "Varna", None, true),
            ],
            ..SelectionContext::default()
        };

        let outcome = locator().locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::Default);
        assert_eq!(outcome.restaurant.id, "first");
    }

    #[tokio::test]
    async fn test_geolocation_supplies_missing_position() {
        let geolocator = Arc::new(MockGeolocator::at("Varna", VARNA));
        let locator = locator().with_geolocator(geolocator.clone());
        let ctx = SelectionContext {
            client_ip: Some("203.0.113.7".to_string()),
            candidates: vec![
                restaurant("first", "Burgas", None, true),
                restaurant("varna", "Varna", None, true),
            ],
            ..SelectionContext::default()
        };

        let outcome = locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.restaurant.id, "varna");
        assert_eq!(geolocator.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_tier_skips_geolocation() {
        let geolocator = Arc::new(MockGeolocator::at("Varna", VARNA));
        let locator = locator().with_geolocator(geolocator.clone());
        let chosen = restaurant("chosen", "Varna", None, true);
        locator.remember_selection(&chosen);

        let ctx = SelectionContext {
            cached_restaurant_id: Some("chosen".to_string()),
            candidates: vec![chosen],
            ..SelectionContext::default()
        };

        locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(geolocator.calls(), 0);
    }

    #[tokio::test]
    async fn test_slow_geolocation_is_abandoned() {
        let slow = Arc::new(MockGeolocator::at("Varna", VARNA).with_delay(Duration::from_secs(10)));
        let config = LocatorConfig {
            geolocation_timeout: Duration::from_millis(20),
            ..LocatorConfig::default()
        };
        let locator = RestaurantLocator::new(config, Arc::new(InMemoryStore::new())).with_geolocator(slow);
        let ctx = SelectionContext {
            candidates: vec![restaurant("only", "Varna", None, true)],
            ..SelectionContext::default()
        };

        let started = std::time::Instant::now();
        let outcome = locator.locate(&ctx, &now()).await.unwrap();

        assert_eq!(outcome.tier, SelectionTier::Default);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_failing_geolocation_falls_through() {
        let locator = locator().with_geolocator(Arc::new(MockGeolocator::failing()));
        let ctx = SelectionContext {
            user_city: Some("Varna".to_string()),
            candidates: vec![restaurant("only", "Varna", None, false)],
            ..SelectionContext::default()
        };

        let outcome = locator.locate(&ctx, &now()).await.unwrap();
        assert_eq!(outcome.tier, SelectionTier::Default);
    }

    #[tokio::test]
    async fn test_non_empty_candidates_never_yield_none() {
        let locator = locator();
        let variants = vec![
            context(vec![restaurant("x", "", None, false)]),
            context(vec![restaurant("y", "Sofia", Some(Coordinates { lat: 0.0, lng: 0.0 }), false)]),
            SelectionContext {
                cached_restaurant_id: Some("unknown".to_string()),
                candidates: vec![restaurant("z", "Varna", Some(VARNA), true)],
                ..SelectionContext::default()
            },
        ];

        for ctx in &variants {
            assert!(locator.locate(ctx, &now()).await.is_some());
        }
    }

    #[test]
    fn test_locator_config_from_app_config() {
        let config = Config {
            search_radius_km: 12.0,
            default_restaurant_id: "7".to_string(),
            ..Config::default()
        };

        let locator_config = LocatorConfig::from(&config);
        assert!((locator_config.search_radius_km - 12.0).abs() < f64::EPSILON);
        assert_eq!(locator_config.default_restaurant_id, "7");
        assert!((locator_config.same_city_assumed_km - SAME_CITY_ASSUMED_KM).abs() < f64::EPSILON);
    }
}
