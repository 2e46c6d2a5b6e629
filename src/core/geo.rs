//! IP geolocation used by the `ip_location` helper.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Resolved location for an IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GeoLocation {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "regionName")]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, alias = "countryCode")]
    pub country_code: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Error)]
pub enum GeoLookupError {
    #[error("geolocation request timed out")]
    Timeout,
    #[error("geolocation request failed: {0}")]
    Request(String),
    #[error("geolocation service returned HTTP {0}")]
    Status(u16),
    #[error("geolocation service could not resolve address: {0}")]
    Unresolved(String),
    #[error("geolocation response was not understood: {0}")]
    Decode(String),
}

impl From<GeoLookupError> for AppError {
    fn from(e: GeoLookupError) -> Self {
        let category = match e {
            GeoLookupError::Timeout => ErrorCategory::TimeoutError,
            GeoLookupError::Decode(_) => ErrorCategory::SerializationError,
            _ => ErrorCategory::NetworkError,
        };
        AppError::new(category, e.to_string()).with_code("HLP-GEO-001")
    }
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoLookupError>;
}

/// JSON-over-HTTP lookup against an ip-api compatible endpoint (`GET {endpoint}/{ip}`).
pub struct HttpGeoLookup {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    location: GeoLocation,
}

impl HttpGeoLookup {
    #[allow(clippy::result_large_err)]
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::InternalError,
                    format!("failed to build geolocation client: {}", err),
                )
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoLookupError> {
        let url = format!("{}/{}", self.endpoint, ip);
        tracing::debug!(%url, "resolving ip location");
        let resp = self.http.get(&url).send().await.map_err(|err| {
            if err.is_timeout() {
                GeoLookupError::Timeout
            } else {
                GeoLookupError::Request(err.to_string())
            }
        })?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(GeoLookupError::Status(status.as_u16()));
        }
        let body: LookupResponse = resp.json().await.map_err(|err| {
            if err.is_timeout() {
                GeoLookupError::Timeout
            } else {
                GeoLookupError::Decode(err.to_string())
            }
        })?;
        if body.status.as_deref() == Some("fail") {
            return Err(GeoLookupError::Unresolved(
                body.message.unwrap_or_else(|| ip.to_string()),
            ));
        }
        Ok(body.location)
    }
}
