//! Turns a [`UserQuery`] into the scaled [`FeatureVector`] the classifier
//! expects.

use std::path::Path;

use crime_risk_prediction_models::{FEATURE_COUNT, FeatureVector, UserQuery};
use thiserror::Error;

use crate::ArtifactError;
use crate::derive::DerivedFeatures;
use crate::labels::{CategoricalField, LabelEncoders};
use crate::scaler::StandardScaler;

/// File name of the label tables inside a model directory.
pub const LABEL_ENCODERS_FILE: &str = "label_encoders.json";
/// File name of the scaler inside a model directory.
pub const SCALER_FILE: &str = "scaler.json";

/// A categorical value that couldn't be encoded and was replaced by 0.
///
/// Never fatal. The classifier was trained against the same fallback, so
/// these are reported instead of raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Substitution {
    /// The label table exists but never saw this value.
    #[error("unseen category {value:?} for {field}, defaulted to 0")]
    UnseenCategory {
        /// Field being encoded.
        field: CategoricalField,
        /// The value the table didn't contain.
        value: String,
    },
    /// No label table was loaded for the field.
    #[error("no label table for {field}, defaulted to 0")]
    MissingTable {
        /// Field being encoded.
        field: CategoricalField,
    },
}

impl Substitution {
    /// The field the substitution happened on.
    #[must_use]
    pub const fn field(&self) -> CategoricalField {
        match self {
            Self::UnseenCategory { field, .. } | Self::MissingTable { field } => *field,
        }
    }
}

/// Result of encoding one query.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    /// Feature values before categorical encoding.
    pub derived: DerivedFeatures,
    /// Unscaled vector, categoricals already encoded.
    pub raw: FeatureVector,
    /// Vector after scaling; this is what the classifier consumes.
    pub scaled: FeatureVector,
    /// Categorical values that fell back to 0.
    pub substitutions: Vec<Substitution>,
}

/// Fitted label tables plus scaler. Built once and shared read-only.
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    labels: LabelEncoders,
    scaler: StandardScaler,
}

impl FeatureEncoder {
    #[must_use]
    pub const fn new(labels: LabelEncoders, scaler: StandardScaler) -> Self {
        Self { labels, scaler }
    }

    /// Loads [`LABEL_ENCODERS_FILE`] and [`SCALER_FILE`] from `model_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if either file is missing or malformed.
    pub fn load(model_dir: &Path) -> Result<Self, ArtifactError> {
        let labels = LabelEncoders::load(&model_dir.join(LABEL_ENCODERS_FILE))?;
        let scaler = StandardScaler::load(&model_dir.join(SCALER_FILE))?;
        Ok(Self::new(labels, scaler))
    }

    /// The label tables, including the classifier output table.
    #[must_use]
    pub const fn labels(&self) -> &LabelEncoders {
        &self.labels
    }

    /// Encodes one categorical value, recording a substitution when the
    /// value can't be encoded.
    #[allow(clippy::cast_precision_loss)]
    fn encode_categorical(
        &self,
        field: CategoricalField,
        value: &str,
        substitutions: &mut Vec<Substitution>,
    ) -> f64 {
        let substitution = match self.labels.for_field(field) {
            Some(table) => match table.transform(value) {
                Some(code) => return code as f64,
                None => Substitution::UnseenCategory {
                    field,
                    value: value.to_string(),
                },
            },
            None => Substitution::MissingTable { field },
        };
        log::warn!("{substitution}");
        substitutions.push(substitution);
        0.0
    }

    /// Encodes `query`. Never fails: values the label tables can't encode
    /// become 0 and are listed in [`EncodedFeatures::substitutions`].
    #[must_use]
    pub fn encode(&self, query: &UserQuery) -> EncodedFeatures {
        let derived = DerivedFeatures::from_query(query);
        let mut substitutions = Vec::new();
        let mut cat = |field: CategoricalField, value: &str| {
            self.encode_categorical(field, value, &mut substitutions)
        };

        let weekday = cat(CategoricalField::Weekday, derived.weekday);
        let completion = cat(CategoricalField::CompletionStatus, derived.completion_status);
        let crime_class = cat(CategoricalField::CrimeClass, derived.crime_class);
        let borough = cat(CategoricalField::Borough, &derived.borough);
        let premise = cat(CategoricalField::Premise, derived.premise);
        let occurrence = cat(CategoricalField::Occurrence, derived.occurrence);
        // JURIS_DESC has no slot in the vector, so its table is never consulted.
        let suspect_age = cat(CategoricalField::SuspectAgeGroup, derived.suspect_age_group);
        let suspect_race = cat(CategoricalField::SuspectRace, derived.suspect_race);
        let suspect_sex = cat(CategoricalField::SuspectSex, derived.suspect_sex);
        let victim_age = cat(
            CategoricalField::VictimAgeGroup,
            derived.victim_age_group.as_ref(),
        );
        let victim_race = cat(CategoricalField::VictimRace, &derived.victim_race);
        let victim_sex = cat(CategoricalField::VictimSex, derived.victim_sex);
        let season = cat(CategoricalField::Season, derived.season.as_ref());

        let values: [f64; FEATURE_COUNT] = [
            f64::from(derived.year),
            f64::from(derived.month),
            f64::from(derived.day),
            f64::from(derived.hour),
            derived.latitude,
            derived.longitude,
            derived.precinct_code,
            derived.jurisdiction_code,
            weekday,
            completion,
            crime_class,
            borough,
            premise,
            occurrence,
            suspect_age,
            suspect_race,
            suspect_sex,
            victim_age,
            victim_race,
            victim_sex,
            season,
            f64::from(u8::from(derived.is_weekend)),
            f64::from(u8::from(derived.is_night)),
            f64::from(u8::from(derived.is_rush_hour)),
            derived.location_crime_density,
        ];
        let raw = FeatureVector(values);
        let scaled = self.scaler.transform(&raw);

        log::debug!(
            "Encoded query for {} {}:00 with {} substitution(s)",
            query.observation_date,
            derived.hour,
            substitutions.len()
        );

        EncodedFeatures {
            derived,
            raw,
            scaled,
            substitutions,
        }
    }
}
