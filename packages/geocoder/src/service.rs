//! Compile-time embedded geocoding service configuration.
//!
//! The Nominatim endpoint, user agent and limits are defined in
//! `services/nominatim.toml`.

use std::time::Duration;

use serde::Deserialize;

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (`"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Search endpoint URL.
    pub base_url: String,
    /// `User-Agent` header sent with every request. Nominatim's usage
    /// policy requires an identifying value.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum results requested per query.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_limit() -> u32 {
    1
}

impl GeocodingService {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const NOMINATIM_TOML: &str = include_str!("../services/nominatim.toml");

/// Returns the embedded Nominatim configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time guarantee
/// since the config is embedded and covered by the tests below).
#[must_use]
pub fn nominatim() -> GeocodingService {
    toml::de::from_str(NOMINATIM_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse geocoding service 'nominatim': {e}"))
}
