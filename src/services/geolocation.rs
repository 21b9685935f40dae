//! Geolocation abstraction layer
//!
//! The customer's position comes from an unreliable external provider, so
//! every lookup here is optional:
//! - `MockGeolocator` for tests and development (no network)
//! - `GuardedGeolocator` adds a timeout and a circuit breaker around a provider
//! - `CachedGeolocator` reuses a result for 24 hours
//!
//! Configuration via GEOLOCATION_BACKEND env variable:
//! - "mock" → MockGeolocator
//! - "ip-api" → cached, guarded IpApiGeolocator

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::defaults::GEOLOCATION_TTL_SECS;
use crate::services::cache::{get_json, set_json, KeyValueStore, IP_GEOLOCATION_KEY};
use crate::services::ip_api::IpApiClient;
use crate::types::Coordinates;

/// Geolocator trait - abstraction for all geolocation providers
#[async_trait]
pub trait Geolocator: Send + Sync {
    /// Locate `client_ip` (or the caller when `None`).
    /// Returns None if the provider has no answer.
    async fn locate(&self, client_ip: Option<&str>) -> Result<Option<GeolocationResult>>;

    /// Get the name of this implementation
    fn name(&self) -> &'static str;
}

/// Result of a geolocation lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeolocationResult {
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub coordinates: Coordinates,
}

// ==========================================================================
// MockGeolocator Implementation
// ==========================================================================

/// Mock geolocator - returns a fixed answer, optionally after a delay
pub struct MockGeolocator {
    result: Option<GeolocationResult>,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicU32,
}

impl MockGeolocator {
    pub fn new(result: Option<GeolocationResult>) -> Self {
        Self {
            result,
            delay: None,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    /// Always answers with `city` at `coordinates`
    pub fn at(city: &str, coordinates: Coordinates) -> Self {
        Self::new(Some(GeolocationResult {
            city: Some(city.to_string()),
            country: None,
            country_code: None,
            coordinates,
        }))
    }

    /// Always fails, like an unreachable provider
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(None)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups served so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Geolocator for MockGeolocator {
    async fn locate(&self, _client_ip: Option<&str>) -> Result<Option<GeolocationResult>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("mock geolocation provider unavailable");
        }
        Ok(self.result.clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ==========================================================================
// IpApiGeolocator Implementation
// ==========================================================================

/// Plain HTTP provider without protection; wrap it in `GuardedGeolocator`
pub struct IpApiGeolocator {
    client: IpApiClient,
}

impl IpApiGeolocator {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            client: IpApiClient::new(base_url)?,
        })
    }
}

#[async_trait]
impl Geolocator for IpApiGeolocator {
    async fn locate(&self, client_ip: Option<&str>) -> Result<Option<GeolocationResult>> {
        self.client.lookup(client_ip).await
    }

    fn name(&self) -> &'static str {
        "ip-api"
    }
}

// ==========================================================================
// CircuitBreaker Implementation
// ==========================================================================

/// Circuit breaker to stop calling a failing provider
pub struct CircuitBreaker {
    failure_count: AtomicU32,
    threshold: u32,
    last_failure: Mutex<Option<Instant>>,
    recovery_time: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, recovery_time: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            threshold,
            last_failure: Mutex::new(None),
            recovery_time,
        }
    }

    /// Check if circuit is open (blocking calls)
    pub fn is_open(&self) -> bool {
        if self.failure_count.load(Ordering::Relaxed) < self.threshold {
            return false;
        }
        match *self.last_failure.lock() {
            // Half-open: allow a retry once the recovery time has passed
            Some(last) => last.elapsed() < self.recovery_time,
            None => true,
        }
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(Instant::now());
    }

    /// Record a success (resets failure count)
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
    }
}

// ==========================================================================
// GuardedGeolocator Implementation
// ==========================================================================

/// Provider wrapper with a hard timeout and a circuit breaker.
/// Timeouts count as failures.
pub struct GuardedGeolocator {
    inner: Arc<dyn Geolocator>,
    timeout: Duration,
    pub(crate) circuit_breaker: CircuitBreaker,
}

impl GuardedGeolocator {
    pub fn new(
        inner: Arc<dyn Geolocator>,
        timeout: Duration,
        circuit_breaker_threshold: u32,
        circuit_breaker_recovery: Duration,
    ) -> Self {
        Self {
            inner,
            timeout,
            circuit_breaker: CircuitBreaker::new(circuit_breaker_threshold, circuit_breaker_recovery),
        }
    }
}

#[async_trait]
impl Geolocator for GuardedGeolocator {
    async fn locate(&self, client_ip: Option<&str>) -> Result<Option<GeolocationResult>> {
        if self.circuit_breaker.is_open() {
            tracing::warn!("Circuit breaker is open, skipping geolocation");
            return Err(anyhow::anyhow!("Geolocation temporarily unavailable (circuit breaker open)"));
        }

        match tokio::time::timeout(self.timeout, self.inner.locate(client_ip)).await {
            Ok(Ok(result)) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Ok(Err(e)) => {
                self.circuit_breaker.record_failure();
                tracing::warn!("Geolocation via {} failed: {}", self.inner.name(), e);
                Err(e)
            }
            Err(_) => {
                self.circuit_breaker.record_failure();
                tracing::warn!("Geolocation via {} timed out after {:?}", self.inner.name(), self.timeout);
                Err(anyhow::anyhow!("Geolocation timed out after {:?}", self.timeout))
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ==========================================================================
// CachedGeolocator Implementation
// ==========================================================================

/// Cached lookup plus capture time (`ip_geolocation` entry)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedGeolocation {
    pub result: GeolocationResult,
    pub captured_at: DateTime<Utc>,
}

/// Reuses successful lookups for 24 hours. Misses and failures are not cached.
pub struct CachedGeolocator {
    inner: Arc<dyn Geolocator>,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl CachedGeolocator {
    pub fn new(inner: Arc<dyn Geolocator>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            inner,
            store,
            ttl: Duration::from_secs(GEOLOCATION_TTL_SECS),
        }
    }

    fn cache_key(client_ip: Option<&str>) -> String {
        match client_ip {
            Some(ip) => format!("{}:{}", IP_GEOLOCATION_KEY, ip),
            None => IP_GEOLOCATION_KEY.to_string(),
        }
    }

    fn is_fresh(&self, entry: &CachedGeolocation) -> bool {
        let age = Utc::now().signed_duration_since(entry.captured_at);
        age.to_std().map_or(true, |age| age < self.ttl)
    }
}

#[async_trait]
impl Geolocator for CachedGeolocator {
    async fn locate(&self, client_ip: Option<&str>) -> Result<Option<GeolocationResult>> {
        let key = Self::cache_key(client_ip);

        if let Some(entry) = get_json::<CachedGeolocation>(self.store.as_ref(), &key) {
            if self.is_fresh(&entry) {
                tracing::debug!("Using cached geolocation from {}", entry.captured_at);
                return Ok(Some(entry.result));
            }
        }

        let result = self.inner.locate(client_ip).await?;
        if let Some(ref found) = result {
            let entry = CachedGeolocation {
                result: found.clone(),
                captured_at: Utc::now(),
            };
            set_json(self.store.as_ref(), &key, &entry, Some(self.ttl));
        }
        Ok(result)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ==========================================================================
// Factory function
// ==========================================================================

/// Create a geolocator based on `config.geolocation_backend`
pub fn create_geolocator(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Arc<dyn Geolocator>> {
    match config.geolocation_backend.as_str() {
        "mock" => {
            tracing::info!("Using MockGeolocator");
            Ok(Arc::new(MockGeolocator::new(None)))
        }
        "ip-api" => {
            tracing::info!("Using IpApiGeolocator at {}", config.geolocation_url);
            let provider: Arc<dyn Geolocator> = Arc::new(IpApiGeolocator::new(&config.geolocation_url)?);
            let guarded: Arc<dyn Geolocator> = Arc::new(GuardedGeolocator::new(
                provider,
                config.geolocation_timeout,
                config.geolocation_cb_threshold,
                config.geolocation_cb_recovery,
            ));
            Ok(Arc::new(CachedGeolocator::new(guarded, store)))
        }
        other => {
            tracing::warn!("Unknown GEOLOCATION_BACKEND '{}', using mock", other);
            Ok(Arc::new(MockGeolocator::new(None)))
        }
    }
}
