//! IP geolocation client (ip-api.com compatible)

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::services::geolocation::GeolocationResult;
use crate::types::Coordinates;

const RESPONSE_FIELDS: &str = "status,message,country,countryCode,city,lat,lon";

/// Provider response. Newer deployments send `latitude`/`longitude`,
/// ip-api sends `lat`/`lon`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpApiResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    #[serde(alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(alias = "lon")]
    pub longitude: Option<f64>,
}

impl IpApiResponse {
    /// `None` for failed lookups or responses without a position
    pub fn into_result(self) -> Option<GeolocationResult> {
        if self.status.as_deref() == Some("fail") {
            tracing::debug!("Geolocation lookup failed: {}", self.message.unwrap_or_default());
            return None;
        }
        let (lat, lng) = (self.latitude?, self.longitude?);
        Some(GeolocationResult {
            city: self.city,
            country: self.country,
            country_code: self.country_code,
            coordinates: Coordinates { lat, lng },
        })
    }
}

/// IP geolocation HTTP client
pub struct IpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl IpApiClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("StorefrontScheduler/1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn lookup_url(&self, client_ip: Option<&str>) -> String {
        let ip = client_ip.map(urlencoding::encode).unwrap_or_default();
        format!("{}/json/{}?fields={}", self.base_url, ip, RESPONSE_FIELDS)
    }

    /// Look up the position of `client_ip`, or of the caller when `None`
    pub async fn lookup(&self, client_ip: Option<&str>) -> Result<Option<GeolocationResult>> {
        let url = self.lookup_url(client_ip);

        let response = self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send geolocation request")?;

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: IpApiResponse = response
            .json()
            .await
            .context("Failed to parse geolocation response")?;

        Ok(body.into_result())
    }
}
