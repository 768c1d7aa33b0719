#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime category types and the category-to-offense lookup.
//!
//! The classifier predicts one of a small set of coarse categories. For
//! display, each category expands into a fixed list of NYPD offense
//! descriptions. Labels the taxonomy doesn't know about (a retrained model
//! may define more categories) expand to [`UNKNOWN_CRIME_TYPE`].

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Offense list entry returned for category labels outside the taxonomy.
pub const UNKNOWN_CRIME_TYPE: &str = "UNKNOWN CRIME TYPE";

/// Coarse crime categories predicted by the classifier.
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
pub enum CrimeCategory {
    /// Narcotics, alcohol and impaired driving offenses
    #[serde(rename = "DRUGS/ALCOHOL")]
    #[strum(serialize = "DRUGS/ALCOHOL")]
    DrugsAlcohol,
    /// Theft, burglary, fraud and damage to property
    #[serde(rename = "PROPERTY")]
    #[strum(serialize = "PROPERTY")]
    Property,
    /// Assaults and other offenses against the person
    #[serde(rename = "PERSONAL")]
    #[strum(serialize = "PERSONAL")]
    Personal,
    /// Sex crimes, harassment and prostitution
    #[serde(rename = "SEXUAL")]
    #[strum(serialize = "SEXUAL")]
    Sexual,
}

impl CrimeCategory {
    /// Returns the NYPD offense descriptions grouped under this category.
    #[must_use]
    pub const fn offenses(self) -> &'static [&'static str] {
        match self {
            Self::DrugsAlcohol => &[
                "DANGEROUS DRUGS",
                "INTOXICATED & IMPAIRED DRIVING",
                "ALCOHOLIC BEVERAGE CONTROL LAW",
                "UNDER THE INFLUENCE OF DRUGS",
                "LOITERING FOR DRUG PURPOSES",
            ],
            Self::Property => &[
                "BURGLARY",
                "PETIT LARCENY",
                "GRAND LARCENY",
                "ROBBERY",
                "THEFT-FRAUD",
                "GRAND LARCENY OF MOTOR VEHICLE",
                "FORGERY",
                "ARSON",
                "POSSESSION OF STOLEN PROPERTY",
                "CRIMINAL MISCHIEF & RELATED OF",
            ],
            Self::Personal => &[
                "ASSAULT 3 & RELATED OFFENSES",
                "FELONY ASSAULT",
                "OFFENSES AGAINST THE PERSON",
                "HOMICIDE-NEGLIGENT,UNCLASSIFIE",
                "KIDNAPPING & RELATED OFFENSES",
                "DANGEROUS WEAPONS",
            ],
            Self::Sexual => &[
                "SEX CRIMES",
                "HARRASSMENT 2",
                "RAPE",
                "PROSTITUTION & RELATED OFFENSES",
                "FELONY SEX CRIMES",
            ],
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::DrugsAlcohol, Self::Property, Self::Personal, Self::Sexual]
    }
}

/// Expands a predicted category label into its offense list.
///
/// The label is matched exactly against the taxonomy. Anything else yields
/// the singleton `["UNKNOWN CRIME TYPE"]`.
#[must_use]
pub fn offenses_for_label(label: &str) -> Vec<String> {
    label.parse::<CrimeCategory>().map_or_else(
        |_| vec![UNKNOWN_CRIME_TYPE.to_string()],
        |category| {
            category
                .offenses()
                .iter()
                .map(|s| (*s).to_string())
                .collect()
        },
    )
}

/// Probability assigned to one category label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProbability {
    /// Category label as defined by the model's label table.
    pub category: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

/// A classifier result expanded for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPrediction {
    /// Predicted category label.
    pub category: String,
    /// Offense descriptions for the category.
    pub offenses: Vec<String>,
    /// Distribution over every category the model knows, in label-table
    /// order. `None` when the model can't produce probabilities.
    pub probabilities: Option<Vec<CategoryProbability>>,
}

impl CategoryPrediction {
    /// Builds a prediction for `category`, expanding its offense list.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        probabilities: Option<Vec<CategoryProbability>>,
    ) -> Self {
        let category = category.into();
        let offenses = offenses_for_label(&category);
        Self {
            category,
            offenses,
            probabilities,
        }
    }

    /// Returns the taxonomy category, if the label is a known one.
    #[must_use]
    pub fn known_category(&self) -> Option<CrimeCategory> {
        self.category.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip_through_strum() {
        for cat in CrimeCategory::all() {
            let parsed: CrimeCategory = cat.to_string().parse().unwrap();
            assert_eq!(parsed, *cat);
        }
        assert_eq!(CrimeCategory::DrugsAlcohol.to_string(), "DRUGS/ALCOHOL");
    }

    #[test]
    fn serde_uses_display_labels() {
        let json = serde_json::to_string(&CrimeCategory::DrugsAlcohol).unwrap();
        assert_eq!(json, "\"DRUGS/ALCOHOL\"");
    }

    #[test]
    fn every_category_has_offenses() {
        for cat in CrimeCategory::all() {
            assert!(!cat.offenses().is_empty(), "{cat} has no offenses");
        }
    }

    #[test]
    fn known_label_expands_to_offense_list() {
        let offenses = offenses_for_label("PROPERTY");
        assert_eq!(offenses.len(), 10);
        assert_eq!(offenses[0], "BURGLARY");
        assert_eq!(offenses[9], "CRIMINAL MISCHIEF & RELATED OF");
    }

    #[test]
    fn unknown_label_expands_to_singleton() {
        assert_eq!(offenses_for_label("WHITE COLLAR"), vec!["UNKNOWN CRIME TYPE"]);
        assert_eq!(offenses_for_label(""), vec!["UNKNOWN CRIME TYPE"]);
        assert_eq!(offenses_for_label("property"), vec!["UNKNOWN CRIME TYPE"]);
    }

    #[test]
    fn prediction_reports_known_category() {
        let pred = CategoryPrediction::new("SEXUAL", None);
        assert_eq!(pred.known_category(), Some(CrimeCategory::Sexual));
        assert_eq!(pred.offenses.len(), 5);

        let other = CategoryPrediction::new("OTHER", None);
        assert_eq!(other.known_category(), None);
        assert_eq!(other.offenses, vec![UNKNOWN_CRIME_TYPE]);
    }
}
