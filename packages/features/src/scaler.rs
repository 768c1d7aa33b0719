//! Fitted per-feature standardization.

use std::path::Path;

use crime_risk_prediction_models::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};
use serde::Deserialize;

use crate::ArtifactError;

/// Column names the scaler and classifier were fitted with, in
/// [`FEATURE_NAMES`] order.
pub const TRAINING_COLUMNS: [&str; FEATURE_COUNT] = [
    "year",
    "month",
    "day",
    "hour",
    "Latitude",
    "Longitude",
    "ADDR_PCT_CD",
    "JURISDICTION_CODE",
    "weekday_encoded",
    "COMPLETED_encoded",
    "CRIME_CLASS_encoded",
    "BORO_NM_encoded",
    "PREM_TYP_DESC_encoded",
    "OCCURENCE_encoded",
    "SUSP_AGE_GROUP_encoded",
    "SUSP_RACE_encoded",
    "SUSP_SEX_encoded",
    "VIC_AGE_GROUP_encoded",
    "VIC_RACE_encoded",
    "VIC_SEX_encoded",
    "season_encoded",
    "is_weekend",
    "is_night",
    "is_rush_hour",
    "location_crime_density",
];

#[derive(Debug, Deserialize)]
struct RawScaler {
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

/// `(x - mean) / scale` applied to each feature.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl StandardScaler {
    /// Builds a scaler from fitted statistics. Zero scale entries (constant
    /// columns) are treated as 1.
    #[must_use]
    pub fn new(mean: [f64; FEATURE_COUNT], mut scale: [f64; FEATURE_COUNT]) -> Self {
        for s in &mut scale {
            if s.abs() < f64::EPSILON {
                *s = 1.0;
            }
        }
        Self { mean, scale }
    }

    /// A scaler that leaves vectors unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            mean: [0.0; FEATURE_COUNT],
            scale: [1.0; FEATURE_COUNT],
        }
    }

    /// Parses the persisted scaler.
    ///
    /// `mean` or `scale` may be `null` when the scaler was fitted without
    /// centering or without scaling. When `feature_names` is present it must
    /// match the expected column order exactly.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the JSON is malformed, a statistic has
    /// the wrong length, or the feature names are out of order.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let raw: RawScaler = serde_json::from_str(json)?;

        if let Some(names) = &raw.feature_names {
            let matches_training = names.iter().map(String::as_str).eq(TRAINING_COLUMNS);
            let matches_local = names.iter().map(String::as_str).eq(FEATURE_NAMES);
            if !matches_training && !matches_local {
                return Err(ArtifactError::FeatureOrder {
                    found: names.clone(),
                });
            }
        }

        let mean = to_array("mean", raw.mean, 0.0)?;
        let scale = to_array("scale", raw.scale, 1.0)?;
        Ok(Self::new(mean, scale))
    }

    /// Reads and parses a scaler file.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] if the file can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Scales every field of `vector`.
    #[must_use]
    pub fn transform(&self, vector: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; FEATURE_COUNT];
        for (idx, value) in vector.0.iter().enumerate() {
            out[idx] = (value - self.mean[idx]) / self.scale[idx];
        }
        FeatureVector(out)
    }
}

fn to_array(
    name: &str,
    values: Option<Vec<f64>>,
    fill: f64,
) -> Result<[f64; FEATURE_COUNT], ArtifactError> {
    let Some(values) = values else {
        return Ok([fill; FEATURE_COUNT]);
    };
    let len = values.len();
    values
        .try_into()
        .map_err(|_| ArtifactError::Invalid {
            message: format!("scaler {name} has {len} entries, expected {FEATURE_COUNT}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_each_feature() {
        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        mean[0] = 2020.0;
        scale[0] = 2.0;
        mean[24] = 100.0;
        scale[24] = 0.0;
        let scaler = StandardScaler::new(mean, scale);

        let mut values = [1.0; FEATURE_COUNT];
        values[0] = 2024.0;
        values[24] = 100.0;
        let scaled = scaler.transform(&FeatureVector(values));

        assert!((scaled.0[0] - 2.0).abs() < 1e-12);
        assert!((scaled.0[1] - 1.0).abs() < 1e-12);
        assert!(scaled.0[24].abs() < 1e-12);
    }

    #[test]
    fn parses_json_with_training_columns() {
        let json = serde_json::json!({
            "mean": vec![1.0; FEATURE_COUNT],
            "scale": vec![2.0; FEATURE_COUNT],
            "feature_names": TRAINING_COLUMNS,
        })
        .to_string();
        let scaler = StandardScaler::from_json(&json).unwrap();
        let scaled = scaler.transform(&FeatureVector([5.0; FEATURE_COUNT]));
        assert!(scaled.0.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn null_statistics_mean_no_centering() {
        let json = serde_json::json!({
            "mean": null,
            "scale": vec![4.0; FEATURE_COUNT],
        })
        .to_string();
        let scaler = StandardScaler::from_json(&json).unwrap();
        let scaled = scaler.transform(&FeatureVector([8.0; FEATURE_COUNT]));
        assert!(scaled.0.iter().all(|v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn rejects_wrong_length() {
        let json = serde_json::json!({
            "mean": vec![0.0; 24],
            "scale": vec![1.0; FEATURE_COUNT],
        })
        .to_string();
        let err = StandardScaler::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("24 entries"), "{err}");
    }

    #[test]
    fn rejects_reordered_columns() {
        let mut names: Vec<&str> = TRAINING_COLUMNS.to_vec();
        names.swap(4, 5);
        let json = serde_json::json!({
            "mean": vec![0.0; FEATURE_COUNT],
            "scale": vec![1.0; FEATURE_COUNT],
            "feature_names": names,
        })
        .to_string();
        assert!(matches!(
            StandardScaler::from_json(&json),
            Err(ArtifactError::FeatureOrder { .. })
        ));
    }
}
