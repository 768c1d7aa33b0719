#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Input and feature types for crime risk prediction.
//!
//! A [`UserQuery`] is built fresh for every prediction request from the
//! form inputs plus the precinct and borough the spatial locator resolved.
//! The encoder turns it into a [`FeatureVector`] whose field order is fixed
//! by [`FEATURE_NAMES`]; the classifier's preprocessing was fitted against
//! exactly that order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of fields in a [`FeatureVector`].
pub const FEATURE_COUNT: usize = 25;

/// Field names of a [`FeatureVector`], in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "year",
    "month",
    "day",
    "hour",
    "latitude",
    "longitude",
    "precinct_code",
    "jurisdiction_code",
    "weekday_encoded",
    "completion_encoded",
    "crime_class_encoded",
    "borough_encoded",
    "premise_encoded",
    "occurrence_encoded",
    "suspect_age_group_encoded",
    "suspect_race_encoded",
    "suspect_sex_encoded",
    "victim_age_group_encoded",
    "victim_race_encoded",
    "victim_sex_encoded",
    "season_encoded",
    "is_weekend",
    "is_night",
    "is_rush_hour",
    "location_crime_density",
];

/// Kind of place the user will be at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum PlaceType {
    #[serde(rename = "In park")]
    #[strum(serialize = "In park")]
    Park,
    #[serde(rename = "In public housing")]
    #[strum(serialize = "In public housing")]
    PublicHousing,
    #[serde(rename = "In station")]
    #[strum(serialize = "In station")]
    TransitStation,
    #[serde(rename = "On street")]
    #[strum(serialize = "On street")]
    Street,
}

impl PlaceType {
    /// Maps a form label to a place type, treating anything unrecognized as
    /// [`PlaceType::Street`].
    #[must_use]
    pub fn from_label_lossy(label: &str) -> Self {
        label.parse().unwrap_or(Self::Street)
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Park,
            Self::PublicHousing,
            Self::TransitStation,
            Self::Street,
        ]
    }
}

/// Victim race, using the NYPD complaint data categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Race {
    #[serde(rename = "WHITE")]
    #[strum(serialize = "WHITE")]
    White,
    #[serde(rename = "WHITE HISPANIC")]
    #[strum(serialize = "WHITE HISPANIC")]
    WhiteHispanic,
    #[serde(rename = "BLACK")]
    #[strum(serialize = "BLACK")]
    Black,
    #[serde(rename = "ASIAN / PACIFIC ISLANDER")]
    #[strum(serialize = "ASIAN / PACIFIC ISLANDER")]
    AsianPacificIslander,
    #[serde(rename = "BLACK HISPANIC")]
    #[strum(serialize = "BLACK HISPANIC")]
    BlackHispanic,
    #[serde(rename = "AMERICAN INDIAN/ALASKAN NATIVE")]
    #[strum(serialize = "AMERICAN INDIAN/ALASKAN NATIVE")]
    AmericanIndianAlaskanNative,
    #[serde(rename = "OTHER")]
    #[strum(serialize = "OTHER")]
    Other,
}

impl Race {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::White,
            Self::WhiteHispanic,
            Self::Black,
            Self::AsianPacificIslander,
            Self::BlackHispanic,
            Self::AmericanIndianAlaskanNative,
            Self::Other,
        ]
    }
}

/// Victim gender as collected by the form.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Male, Self::Female]
    }
}

/// One of the five NYC boroughs.
///
/// Parsing is case-insensitive so both the boundary dataset's `BoroName`
/// values and the upper-case complaint data spelling are accepted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Borough {
    Manhattan,
    Bronx,
    Brooklyn,
    Queens,
    #[serde(rename = "Staten Island")]
    #[strum(serialize = "Staten Island")]
    StatenIsland,
}

impl Borough {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Manhattan,
            Self::Bronx,
            Self::Brooklyn,
            Self::Queens,
            Self::StatenIsland,
        ]
    }
}

/// Meteorological season of the observation month.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

/// Victim age bucket, bounds inclusive as named.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum AgeGroup {
    #[serde(rename = "<18")]
    #[strum(serialize = "<18")]
    Under18,
    #[serde(rename = "18-24")]
    #[strum(serialize = "18-24")]
    From18To24,
    #[serde(rename = "25-44")]
    #[strum(serialize = "25-44")]
    From25To44,
    #[serde(rename = "45-64")]
    #[strum(serialize = "45-64")]
    From45To64,
    #[serde(rename = "65+")]
    #[strum(serialize = "65+")]
    Over65,
}

/// A single prediction request.
///
/// `precinct` and `borough` come from the spatial locator. The encoder
/// accepts a query without them, but callers should refuse to predict until
/// both are resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    /// Date the user plans to be at the location.
    pub observation_date: NaiveDate,
    /// Hour of day, 0-23. Larger values are treated as midnight.
    pub observation_hour: u32,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Kind of place.
    pub place_type: PlaceType,
    /// Age in years.
    pub age: u32,
    /// Race category.
    pub race: Race,
    /// Gender.
    pub gender: Gender,
    /// NYPD precinct number.
    pub precinct: Option<u32>,
    /// Borough containing the point.
    pub borough: Option<Borough>,
}

impl UserQuery {
    /// Returns the hour with out-of-range values folded to 0.
    #[must_use]
    pub const fn normalized_hour(&self) -> u32 {
        if self.observation_hour < 24 {
            self.observation_hour
        } else {
            0
        }
    }

    /// Whether both location attributes are present.
    #[must_use]
    pub const fn is_location_resolved(&self) -> bool {
        self.precinct.is_some() && self.borough.is_some()
    }
}

/// Fixed-order numeric input to the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Returns the fields in order.
    #[must_use]
    pub const fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Looks up a field by its [`FEATURE_NAMES`] entry.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|idx| self.0[idx])
    }

    /// Iterates `(name, value)` pairs in order.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self([0.0; FEATURE_COUNT])
    }
}
