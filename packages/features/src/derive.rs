//! Pure derivations from a [`UserQuery`] to the pre-encoding feature values.
//!
//! Every rule here mirrors the feature engineering the classifier was
//! trained with, boundaries included. Several look odd (hour 6 counts as
//! night, the suspect sex default is the literal string `(null)`) but they
//! must stay as they are or the model sees inputs it was never fitted on.

use chrono::{Datelike as _, NaiveDate, Weekday};
use crime_risk_prediction_models::{AgeGroup, Gender, PlaceType, Season, UserQuery};

/// Offense completion status assumed for every query.
pub const COMPLETION_STATUS: &str = "COMPLETED";
/// Law category assumed for every query.
pub const CRIME_CLASS: &str = "FELONY";
/// Jurisdiction responsible for every query.
pub const JURISDICTION_DESCRIPTION: &str = "N.Y. POLICE DEPT";
/// Numeric jurisdiction code of the NYPD.
pub const JURISDICTION_CODE: f64 = 0.0;
/// Suspect age group when nothing is known about the suspect.
pub const SUSPECT_AGE_GROUP: &str = "UNKNOWN";
/// Suspect race when nothing is known about the suspect.
pub const SUSPECT_RACE: &str = "UNKNOWN";
/// Suspect sex sentinel used by the complaint data for missing values.
pub const SUSPECT_SEX: &str = "(null)";
/// Borough label used when the locator couldn't resolve one.
pub const UNKNOWN_BOROUGH: &str = "UNKNOWN";
/// Placeholder for historical crime density at the location.
///
/// Not computed from data. Replacing it with a real density shifts the
/// model's input distribution and needs a retrained artifact.
pub const LOCATION_CRIME_DENSITY: f64 = 100.0;

/// English name of the weekday `date` falls on.
#[must_use]
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Whether `date` is a Saturday or Sunday.
#[must_use]
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Night runs from 20:00 through 06:59, both boundary hours included.
#[must_use]
pub const fn is_night(hour: u32) -> bool {
    hour >= 20 || hour <= 6
}

/// Morning (7-9) and evening (17-19) rush hours.
#[must_use]
pub const fn is_rush_hour(hour: u32) -> bool {
    matches!(hour, 7..=9 | 17..=19)
}

/// Season of a 1-based month. Months outside 1-12 fall to
/// [`Season::Fall`].
#[must_use]
pub const fn season_for_month(month: u32) -> Season {
    match month {
        12 | 1 | 2 => Season::Winter,
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        _ => Season::Fall,
    }
}

/// Age bucket for `age` years.
#[must_use]
pub const fn age_group(age: u32) -> AgeGroup {
    match age {
        0..=17 => AgeGroup::Under18,
        18..=24 => AgeGroup::From18To24,
        25..=44 => AgeGroup::From25To44,
        45..=64 => AgeGroup::From45To64,
        _ => AgeGroup::Over65,
    }
}

/// Premise description and occurrence indicator for a place type.
#[must_use]
pub const fn premise_for(place: PlaceType) -> (&'static str, &'static str) {
    match place {
        PlaceType::Park => ("PARK/PLAYGROUND", "INSIDE"),
        PlaceType::PublicHousing => ("RESIDENCE - PUBLIC HOUSING", "INSIDE"),
        PlaceType::TransitStation => ("TRANSIT - NYC SUBWAY", "INSIDE"),
        PlaceType::Street => ("STREET", "FRONT OF"),
    }
}

/// Like [`premise_for`] but from the raw form label, so unrecognized
/// labels land on the street mapping.
#[must_use]
pub fn premise_for_label(label: &str) -> (&'static str, &'static str) {
    premise_for(PlaceType::from_label_lossy(label))
}

/// Single-letter victim sex code.
#[must_use]
pub const fn sex_code(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "M",
        Gender::Female => "F",
    }
}

/// All feature values of a query before categorical encoding and scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub precinct_code: f64,
    pub jurisdiction_code: f64,
    pub weekday: &'static str,
    pub completion_status: &'static str,
    pub crime_class: &'static str,
    pub borough: String,
    pub premise: &'static str,
    pub occurrence: &'static str,
    pub jurisdiction_description: &'static str,
    pub suspect_age_group: &'static str,
    pub suspect_race: &'static str,
    pub suspect_sex: &'static str,
    pub victim_age_group: AgeGroup,
    pub victim_race: String,
    pub victim_sex: &'static str,
    pub season: Season,
    pub is_weekend: bool,
    pub is_night: bool,
    pub is_rush_hour: bool,
    pub location_crime_density: f64,
}

impl DerivedFeatures {
    /// Derives every feature value of `query`.
    #[must_use]
    pub fn from_query(query: &UserQuery) -> Self {
        let date = query.observation_date;
        let hour = query.normalized_hour();
        let (premise, occurrence) = premise_for(query.place_type);

        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            hour,
            latitude: query.latitude,
            longitude: query.longitude,
            precinct_code: query.precinct.map_or(0.0, f64::from),
            jurisdiction_code: JURISDICTION_CODE,
            weekday: weekday_name(date),
            completion_status: COMPLETION_STATUS,
            crime_class: CRIME_CLASS,
            borough: query
                .borough
                .map_or_else(|| UNKNOWN_BOROUGH.to_string(), |b| b.as_ref().to_uppercase()),
            premise,
            occurrence,
            jurisdiction_description: JURISDICTION_DESCRIPTION,
            suspect_age_group: SUSPECT_AGE_GROUP,
            suspect_race: SUSPECT_RACE,
            suspect_sex: SUSPECT_SEX,
            victim_age_group: age_group(query.age),
            victim_race: query.race.as_ref().to_uppercase(),
            victim_sex: sex_code(query.gender),
            season: season_for_month(date.month()),
            is_weekend: is_weekend(date),
            is_night: is_night(hour),
            is_rush_hour: is_rush_hour(hour),
            location_crime_density: LOCATION_CRIME_DENSITY,
        }
    }
}
