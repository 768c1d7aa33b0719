#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address lookup for the crime risk tools.
//!
//! Turns a free-form destination ("Empire State Building", "Broadway & W
//! 42nd St") into WGS84 coordinates using Nominatim. The service endpoint,
//! user agent and timeout come from the embedded [`service`] configuration.

pub mod nominatim;
pub mod service;

use serde::Serialize;
use thiserror::Error;

use crate::service::GeocodingService;

/// A geocoding result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Canonical name the service matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Reusable geocoding client.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    service: GeocodingService,
}

impl Geocoder {
    /// Builds a client for `service`, applying its timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client can't be built.
    pub fn new(service: GeocodingService) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(service.user_agent.clone())
            .timeout(service.timeout())
            .build()?;
        Ok(Self { client, service })
    }

    /// Builds a client for the embedded Nominatim configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client can't be built.
    pub fn nominatim() -> Result<Self, GeocodeError> {
        Self::new(service::nominatim())
    }

    #[must_use]
    pub const fn service(&self) -> &GeocodingService {
        &self.service
    }

    /// Looks up `query`. Blank queries resolve to `None` without a request.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response can't
    /// be parsed. No retries are attempted.
    pub async fn geocode(&self, query: &str) -> Result<Option<GeocodedPoint>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }

        log::debug!("Geocoding {query:?} via {}", self.service.id);
        let result = nominatim::geocode_freeform(
            &self.client,
            &self.service.base_url,
            query,
            self.service.limit,
        )
        .await?;

        if result.is_none() {
            log::info!("No geocoding match for {query:?}");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_from_embedded_service() {
        let geocoder = Geocoder::nominatim().unwrap();
        assert_eq!(geocoder.service().id, "nominatim");
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let geocoder = Geocoder::nominatim().unwrap();
        assert!(geocoder.geocode("   ").await.unwrap().is_none());
    }

    #[test]
    fn point_serializes_camel_case_without_missing_name() {
        let point = GeocodedPoint {
            latitude: 40.7,
            longitude: -73.9,
            display_name: None,
        };
        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            serde_json::json!({ "latitude": 40.7, "longitude": -73.9 })
        );
    }
}
