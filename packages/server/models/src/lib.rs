#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the crime risk server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the prediction types to allow independent evolution of the API
//! contract.

use chrono::NaiveDate;
use crime_risk_crime_models::{CategoryProbability, CrimeCategory};
use crime_risk_prediction_models::{Borough, Gender, PlaceType, Race, UserQuery};
use serde::{Deserialize, Serialize};

/// Server health as returned by `/api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Whether boundary data loaded, i.e. whether predictions are possible.
    pub locator_available: bool,
}

/// Error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

impl ApiError {
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A crime category and the offenses it groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCategory {
    /// Category label.
    pub name: String,
    /// Offense descriptions.
    pub offenses: Vec<String>,
}

impl From<CrimeCategory> for ApiCategory {
    fn from(category: CrimeCategory) -> Self {
        Self {
            name: category.to_string(),
            offenses: category
                .offenses()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Initial map view for a frontend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDefaults {
    /// Center latitude.
    pub latitude: f64,
    /// Center longitude.
    pub longitude: f64,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl MapDefaults {
    /// New York City, zoomed to show all five boroughs.
    pub const NYC: Self = Self {
        latitude: 40.704_467,
        longitude: -73.892_246,
        zoom: 11,
        min_zoom: 11,
        max_zoom: 15,
    };
}

impl Default for MapDefaults {
    fn default() -> Self {
        Self::NYC
    }
}

/// Form choices as returned by `/api/options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOptions {
    pub place_types: Vec<String>,
    pub races: Vec<String>,
    pub genders: Vec<String>,
    pub boroughs: Vec<String>,
    /// Initial map view.
    pub map: MapDefaults,
}

impl ApiOptions {
    /// Options listing every supported value.
    #[must_use]
    pub fn all() -> Self {
        fn labels<T: ToString>(items: &[T]) -> Vec<String> {
            items.iter().map(ToString::to_string).collect()
        }

        Self {
            place_types: labels(PlaceType::all()),
            races: labels(Race::all()),
            genders: labels(Gender::all()),
            boroughs: labels(Borough::all()),
            map: MapDefaults::NYC,
        }
    }
}

/// Body of `POST /api/locate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocateRequest {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// Response of `POST /api/locate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLocation {
    /// Containing precinct, if any.
    pub precinct: Option<u32>,
    /// Containing borough, if any.
    pub borough: Option<Borough>,
    /// Whether both are known, i.e. whether a prediction can be made.
    pub resolved: bool,
}

/// Body of `POST /api/predict`.
///
/// Precinct and borough are never taken from the client; the server
/// resolves them from the coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    /// Date the user plans to be at the location.
    pub observation_date: NaiveDate,
    /// Hour of day, 0-23.
    pub observation_hour: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Place type label; unrecognized labels are treated as on street.
    pub place_type: String,
    pub age: u32,
    pub race: Race,
    pub gender: Gender,
}

impl PredictRequest {
    /// Builds a query with precinct and borough left unresolved.
    #[must_use]
    pub fn into_query(self) -> UserQuery {
        UserQuery {
            observation_date: self.observation_date,
            observation_hour: self.observation_hour,
            latitude: self.latitude,
            longitude: self.longitude,
            place_type: PlaceType::from_label_lossy(&self.place_type),
            age: self.age,
            race: self.race,
            gender: self.gender,
            precinct: None,
            borough: None,
        }
    }
}

/// Response of `POST /api/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPrediction {
    /// Predicted category label.
    pub category: String,
    /// Offenses grouped under the category.
    pub offenses: Vec<String>,
    /// Distribution over all categories, when the model provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<CategoryProbability>>,
    /// Precinct the prediction was made for.
    pub precinct: u32,
    /// Borough the prediction was made for.
    pub borough: Borough,
    /// Inputs that fell back to a default encoding.
    pub substitutions: Vec<String>,
}

/// Query parameters for `GET /api/geocode`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeParams {
    /// Free-form address or place name.
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_list_every_choice() {
        let options = ApiOptions::all();
        assert_eq!(options.place_types.len(), 4);
        assert!(options.place_types.contains(&"In public housing".to_string()));
        assert_eq!(options.races.len(), 7);
        assert_eq!(options.genders, vec!["Male", "Female"]);
        assert!(options.boroughs.contains(&"Staten Island".to_string()));
        assert_eq!(options.map, MapDefaults::NYC);
    }

    #[test]
    fn predict_request_parses_camel_case_and_leaves_location_unresolved() {
        let request: PredictRequest = serde_json::from_value(serde_json::json!({
            "observationDate": "2024-07-15",
            "observationHour": 21,
            "latitude": 40.75,
            "longitude": -73.99,
            "placeType": "In station",
            "age": 30,
            "race": "WHITE",
            "gender": "Female"
        }))
        .unwrap();
        let query = request.into_query();
        assert_eq!(query.place_type, PlaceType::TransitStation);
        assert_eq!(query.race, Race::White);
        assert!(!query.is_location_resolved());
    }

    #[test]
    fn unknown_place_type_is_treated_as_street() {
        let request = PredictRequest {
            observation_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            observation_hour: 0,
            latitude: 40.7,
            longitude: -73.9,
            place_type: "On a boat".to_string(),
            age: 40,
            race: Race::Other,
            gender: Gender::Male,
        };
        assert_eq!(request.into_query().place_type, PlaceType::Street);
    }

    #[test]
    fn category_lists_its_offenses() {
        let api = ApiCategory::from(CrimeCategory::Sexual);
        assert_eq!(api.name, CrimeCategory::Sexual.to_string());
        assert_eq!(api.offenses.len(), CrimeCategory::Sexual.offenses().len());
    }

    #[test]
    fn health_serializes_camel_case() {
        let health = ApiHealth {
            healthy: true,
            version: "0.1.0".to_string(),
            locator_available: false,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["locatorAvailable"], serde_json::json!(false));
    }
}
