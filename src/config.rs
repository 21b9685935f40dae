//! Configuration management

use std::str::FromStr;
use std::time::Duration;

use anyhow::{self, Context, Result};

use crate::defaults::{DEFAULT_RESTAURANT_ID, GEOLOCATION_TIMEOUT_MS, SEARCH_RADIUS_KM};

const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com";
const DEFAULT_CB_THRESHOLD: u32 = 3;
const DEFAULT_CB_RECOVERY_SECS: u64 = 300;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Geolocation backend: "mock" or "ip-api"
    pub geolocation_backend: String,

    /// Geolocation provider base URL
    pub geolocation_url: String,

    /// Lookups slower than this are abandoned
    pub geolocation_timeout: Duration,

    /// Consecutive failures before the circuit breaker opens
    pub geolocation_cb_threshold: u32,

    pub geolocation_cb_recovery: Duration,

    /// Location served when nothing better is known
    pub default_restaurant_id: String,

    pub search_radius_km: f64,

    /// Directory for rolling log files (stdout only when unset)
    pub logs_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geolocation_backend: "mock".to_string(),
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            geolocation_timeout: Duration::from_millis(GEOLOCATION_TIMEOUT_MS),
            geolocation_cb_threshold: DEFAULT_CB_THRESHOLD,
            geolocation_cb_recovery: Duration::from_secs(DEFAULT_CB_RECOVERY_SECS),
            default_restaurant_id: DEFAULT_RESTAURANT_ID.to_string(),
            search_radius_km: SEARCH_RADIUS_KM,
            logs_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unset variables fall back to defaults
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let geolocation_timeout = parse_var::<u64, _>(&var, "GEOLOCATION_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.geolocation_timeout);

        let geolocation_cb_recovery = parse_var::<u64, _>(&var, "GEOLOCATION_CB_RECOVERY_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.geolocation_cb_recovery);

        let search_radius_km = parse_var::<f64, _>(&var, "SEARCH_RADIUS_KM")?
            .unwrap_or(defaults.search_radius_km);

        if !(search_radius_km.is_finite() && search_radius_km > 0.0) {
            anyhow::bail!("SEARCH_RADIUS_KM must be a positive number (got {})", search_radius_km);
        }

        Ok(Self {
            geolocation_backend: var("GEOLOCATION_BACKEND").unwrap_or(defaults.geolocation_backend),
            geolocation_url: var("GEOLOCATION_URL").unwrap_or(defaults.geolocation_url),
            geolocation_timeout,
            geolocation_cb_threshold: parse_var(&var, "GEOLOCATION_CB_THRESHOLD")?
                .unwrap_or(defaults.geolocation_cb_threshold),
            geolocation_cb_recovery,
            default_restaurant_id: var("DEFAULT_RESTAURANT_ID")
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(defaults.default_restaurant_id),
            search_radius_km,
            logs_dir: var("LOGS_DIR").filter(|dir| !dir.trim().is_empty()),
        })
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value '{}'", key, raw))
        })
        .transpose()
}
