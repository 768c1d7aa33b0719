#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end crime category prediction.
//!
//! [`PredictionContext`] bundles the fitted feature encoder, the classifier
//! and the category label table. It is built once at startup, never
//! mutated, and shared by reference (or `Arc`) between requests.

pub mod paths;

use std::path::Path;

use crime_risk_classifier::{Classifier, ClassifierError, GradientBoostedTrees};
use crime_risk_crime_models::{CategoryPrediction, CategoryProbability};
use crime_risk_features::labels::{CRIME_CATEGORY_KEY, LabelEncoder};
use crime_risk_features::{ArtifactError, FeatureEncoder, Substitution};
use crime_risk_prediction_models::{Borough, FEATURE_COUNT, FeatureVector, UserQuery};
use crime_risk_spatial::{Location, SpatialLocator};
use thiserror::Error;

/// File name of the classifier inside a model directory.
pub const CLASSIFIER_FILE: &str = "classifier.json";

/// Errors building a context or running a prediction.
#[derive(Debug, Error)]
pub enum PredictError {
    /// Encoder artifacts failed to load.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Classifier failed to load or run.
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// The label tables have no category table to decode predictions with.
    #[error("No CRIME_CATEGORY label table in model artifacts")]
    MissingCategoryTable,

    /// The classifier expects a different vector length than the encoder
    /// produces.
    #[error("Classifier expects {expected} features, encoder produces {}", FEATURE_COUNT)]
    FeatureMismatch {
        /// Features the classifier was trained on.
        expected: usize,
    },

    /// The classifier returned a class index the category table doesn't have.
    #[error("Class index {index} is outside the {classes}-entry category table")]
    UnknownClass {
        /// Index returned by the classifier.
        index: usize,
        /// Size of the category table.
        classes: usize,
    },

    /// Precinct or borough is missing; prediction is blocked until both are
    /// known.
    #[error("No location resolved (precinct={precinct:?}, borough={borough:?})")]
    LocationUnresolved {
        /// Precinct, if found.
        precinct: Option<u32>,
        /// Borough, if found.
        borough: Option<Borough>,
    },
}

/// Result of one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    /// Predicted category with its offense list and probabilities.
    pub prediction: CategoryPrediction,
    /// Precinct the prediction was made for.
    pub precinct: u32,
    /// Borough the prediction was made for.
    pub borough: Borough,
    /// Scaled vector fed to the classifier.
    pub features: FeatureVector,
    /// Categorical values that fell back to 0 during encoding.
    pub substitutions: Vec<Substitution>,
}

/// Immutable model state shared by every prediction.
pub struct PredictionContext {
    encoder: FeatureEncoder,
    classifier: Box<dyn Classifier>,
    categories: LabelEncoder,
}

impl std::fmt::Debug for PredictionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionContext")
            .field("encoder", &self.encoder)
            .field("num_features", &self.classifier.num_features())
            .field("num_classes", &self.classifier.num_classes())
            .field("categories", &self.categories.classes())
            .finish()
    }
}

impl PredictionContext {
    /// Loads the label tables, scaler and [`CLASSIFIER_FILE`] from
    /// `model_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError`] if any artifact is missing or malformed, or
    /// if the artifacts disagree with each other.
    pub fn load(model_dir: &Path) -> Result<Self, PredictError> {
        log::info!("Loading model artifacts from {}", model_dir.display());
        let encoder = FeatureEncoder::load(model_dir)?;
        let classifier = GradientBoostedTrees::load(&model_dir.join(CLASSIFIER_FILE))?;
        log::info!(
            "Loaded {:?} classifier with {} classes",
            classifier.objective(),
            classifier.num_classes()
        );
        Self::from_parts(encoder, Box::new(classifier))
    }

    /// Assembles a context from already-built parts. The category table is
    /// taken from the encoder's label tables.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::MissingCategoryTable`] if there is no category
    /// table, or [`PredictError::FeatureMismatch`] if the classifier wasn't
    /// trained on the encoder's vector layout.
    pub fn from_parts(
        encoder: FeatureEncoder,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, PredictError> {
        let categories = encoder
            .labels()
            .get(CRIME_CATEGORY_KEY)
            .cloned()
            .ok_or(PredictError::MissingCategoryTable)?;

        if classifier.num_features() != FEATURE_COUNT {
            return Err(PredictError::FeatureMismatch {
                expected: classifier.num_features(),
            });
        }
        if classifier.num_classes() != categories.len() {
            log::warn!(
                "Classifier has {} classes but the category table has {}",
                classifier.num_classes(),
                categories.len()
            );
        }

        Ok(Self {
            encoder,
            classifier,
            categories,
        })
    }

    #[must_use]
    pub const fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Category labels in class-index order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        self.categories.classes()
    }

    /// Predicts the crime category for a query whose precinct and borough
    /// are already known.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::LocationUnresolved`] if either location field
    /// is missing, and a classifier error or [`PredictError::UnknownClass`]
    /// if inference fails.
    pub fn predict(&self, query: &UserQuery) -> Result<PredictionOutcome, PredictError> {
        let (Some(precinct), Some(borough)) = (query.precinct, query.borough) else {
            return Err(PredictError::LocationUnresolved {
                precinct: query.precinct,
                borough: query.borough,
            });
        };

        let encoded = self.encoder.encode(query);
        let features = encoded.scaled.as_slice();

        let index = self.classifier.classify(features)?;
        let category = self.decode(index)?;
        let probabilities = self
            .classifier
            .classify_proba(features)?
            .map(|proba| self.pair_probabilities(proba));

        log::debug!(
            "Predicted {category} for precinct {precinct} in {borough} ({} substitutions)",
            encoded.substitutions.len()
        );

        Ok(PredictionOutcome {
            prediction: CategoryPrediction::new(category, probabilities),
            precinct,
            borough,
            features: encoded.scaled,
            substitutions: encoded.substitutions,
        })
    }

    /// Resolves the query's point with `locator`, then predicts.
    ///
    /// Any precinct or borough already on `query` is replaced by the
    /// locator's answer.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::LocationUnresolved`] unless the locator finds
    /// both precinct and borough, otherwise as [`Self::predict`].
    pub fn predict_at(
        &self,
        query: &UserQuery,
        locator: &SpatialLocator,
    ) -> Result<PredictionOutcome, PredictError> {
        let location = locator.locate(query.latitude, query.longitude);
        let Location {
            precinct: Some(precinct),
            borough: Some(borough),
        } = location
        else {
            return Err(PredictError::LocationUnresolved {
                precinct: location.precinct,
                borough: location.borough,
            });
        };

        let query = UserQuery {
            precinct: Some(precinct),
            borough: Some(borough),
            ..query.clone()
        };
        self.predict(&query)
    }

    /// Pairs class probabilities with category labels, stopping at
    /// whichever list is shorter.
    fn pair_probabilities(&self, proba: Vec<f64>) -> Vec<CategoryProbability> {
        let classes = self.categories.classes();
        if proba.len() != classes.len() {
            log::warn!(
                "Classifier returned {} probabilities for {} categories; dropping the excess",
                proba.len(),
                classes.len()
            );
        }
        classes
            .iter()
            .zip(proba)
            .map(|(category, probability)| CategoryProbability {
                category: category.clone(),
                probability,
            })
            .collect()
    }

    fn decode(&self, index: usize) -> Result<&str, PredictError> {
        self.categories
            .inverse_transform(index)
            .ok_or(PredictError::UnknownClass {
                index,
                classes: self.categories.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crime_risk_crime_models::{CrimeCategory, UNKNOWN_CRIME_TYPE};
    use crime_risk_features::labels::{CategoricalField, LabelEncoders};
    use crime_risk_features::scaler::StandardScaler;
    use crime_risk_prediction_models::{Gender, PlaceType, Race};
    use crime_risk_spatial::BoundaryLayer;
    use crime_risk_spatial::datasets;
    use crime_risk_spatial::projection::{Crs, Projection};
    use serde_json::json;

    use super::*;

    /// Classifier returning a fixed answer.
    struct Fixed {
        class: usize,
        proba: Option<Vec<f64>>,
        num_features: usize,
    }

    impl Classifier for Fixed {
        fn num_features(&self) -> usize {
            self.num_features
        }

        fn num_classes(&self) -> usize {
            self.proba.as_ref().map_or(4, Vec::len)
        }

        fn classify(&self, features: &[f64]) -> Result<usize, ClassifierError> {
            self.check_features(features)?;
            Ok(self.class)
        }

        fn classify_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ClassifierError> {
            self.check_features(features)?;
            Ok(self.proba.clone())
        }
    }

    fn fixed(class: usize, proba: Option<Vec<f64>>) -> Box<dyn Classifier> {
        Box::new(Fixed {
            class,
            proba,
            num_features: FEATURE_COUNT,
        })
    }

    fn table(items: &[&str]) -> LabelEncoder {
        LabelEncoder::from_classes(items.iter().map(|s| (*s).to_string()).collect()).unwrap()
    }

    fn encoder() -> FeatureEncoder {
        let mut labels = LabelEncoders::default();
        labels.insert(
            CRIME_CATEGORY_KEY,
            table(&["DRUGS/ALCOHOL", "PERSONAL", "PROPERTY", "SEXUAL"]),
        );
        labels.insert(
            CategoricalField::Borough.table_key(),
            table(&["BRONX", "BROOKLYN", "MANHATTAN", "QUEENS", "STATEN ISLAND"]),
        );
        FeatureEncoder::new(labels, StandardScaler::identity())
    }

    fn query() -> UserQuery {
        UserQuery {
            observation_date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            observation_hour: 21,
            latitude: 40.75,
            longitude: -73.99,
            place_type: PlaceType::Street,
            age: 30,
            race: Race::White,
            gender: Gender::Female,
            precinct: Some(14),
            borough: Some(Borough::Manhattan),
        }
    }

    #[test]
    fn predict_decodes_class_and_expands_offenses() {
        let ctx = PredictionContext::from_parts(
            encoder(),
            fixed(2, Some(vec![0.1, 0.2, 0.6, 0.1])),
        )
        .unwrap();
        let outcome = ctx.predict(&query()).unwrap();

        assert_eq!(outcome.prediction.category, "PROPERTY");
        assert_eq!(
            outcome.prediction.known_category(),
            Some(CrimeCategory::Property)
        );
        assert_eq!(
            outcome.prediction.offenses.len(),
            CrimeCategory::Property.offenses().len()
        );
        let probabilities = outcome.prediction.probabilities.unwrap();
        assert_eq!(probabilities.len(), 4);
        assert_eq!(probabilities[0].category, "DRUGS/ALCOHOL");
        assert!((probabilities[2].probability - 0.6).abs() < 1e-12);
        assert_eq!(outcome.precinct, 14);
        assert_eq!(outcome.borough, Borough::Manhattan);
    }

    #[test]
    fn predict_reports_substitutions_for_missing_tables() {
        let ctx = PredictionContext::from_parts(encoder(), fixed(0, None)).unwrap();
        let outcome = ctx.predict(&query()).unwrap();
        assert!(outcome.prediction.probabilities.is_none());
        assert!(
            outcome
                .substitutions
                .iter()
                .any(|s| s.field() == CategoricalField::Weekday)
        );
        // The borough table was supplied, so no substitution for it.
        assert!(
            !outcome
                .substitutions
                .iter()
                .any(|s| s.field() == CategoricalField::Borough)
        );
    }

    #[test]
    fn unresolved_query_is_refused() {
        let ctx = PredictionContext::from_parts(encoder(), fixed(0, None)).unwrap();
        let mut q = query();
        q.borough = None;
        let err = ctx.predict(&q).unwrap_err();
        assert!(matches!(
            err,
            PredictError::LocationUnresolved {
                precinct: Some(14),
                borough: None,
            }
        ));
    }

    #[test]
    fn class_index_outside_table_is_an_error() {
        let ctx = PredictionContext::from_parts(encoder(), fixed(7, None)).unwrap();
        let err = ctx.predict(&query()).unwrap_err();
        assert!(matches!(
            err,
            PredictError::UnknownClass {
                index: 7,
                classes: 4
            }
        ));
    }

    #[test]
    fn extra_classifier_classes_are_dropped_from_probabilities() {
        let ctx = PredictionContext::from_parts(
            encoder(),
            fixed(1, Some(vec![0.1, 0.5, 0.1, 0.1, 0.2])),
        )
        .unwrap();
        let outcome = ctx.predict(&query()).unwrap();

        assert_eq!(outcome.prediction.category, "PERSONAL");
        let probabilities = outcome.prediction.probabilities.unwrap();
        let labels: Vec<&str> = probabilities.iter().map(|p| p.category.as_str()).collect();
        assert_eq!(labels, ["DRUGS/ALCOHOL", "PERSONAL", "PROPERTY", "SEXUAL"]);
    }

    #[test]
    fn unknown_category_label_maps_to_unknown_crime_type() {
        let mut labels = LabelEncoders::default();
        labels.insert(CRIME_CATEGORY_KEY, table(&["ARSON"]));
        let encoder = FeatureEncoder::new(labels, StandardScaler::identity());
        let ctx = PredictionContext::from_parts(encoder, fixed(0, None)).unwrap();
        let outcome = ctx.predict(&query()).unwrap();
        assert_eq!(outcome.prediction.category, "ARSON");
        assert_eq!(outcome.prediction.offenses, vec![UNKNOWN_CRIME_TYPE]);
    }

    #[test]
    fn context_requires_category_table() {
        let encoder = FeatureEncoder::new(LabelEncoders::default(), StandardScaler::identity());
        let err = PredictionContext::from_parts(encoder, fixed(0, None)).unwrap_err();
        assert!(matches!(err, PredictError::MissingCategoryTable));
    }

    #[test]
    fn context_rejects_classifier_with_other_feature_count() {
        let classifier = Box::new(Fixed {
            class: 0,
            proba: None,
            num_features: 24,
        });
        let err = PredictionContext::from_parts(encoder(), classifier).unwrap_err();
        assert!(matches!(err, PredictError::FeatureMismatch { expected: 24 }));
    }

    /// Writes `classifier.json`, `scaler.json` and `label_encoders.json`
    /// into a fresh directory under the system temp dir.
    fn write_model_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        // One stump per class on `is_night` (index 22): night favors PERSONAL.
        let left = [1.0, -1.0, 0.0, 0.0];
        let right = [-1.0, 2.0, 0.0, -0.5];
        let trees: Vec<serde_json::Value> = left
            .iter()
            .zip(right)
            .enumerate()
            .map(|(id, (l, r))| {
                json!({
                    "id": id,
                    "left_children": [1, -1, -1],
                    "right_children": [2, -1, -1],
                    "split_indices": [22, 0, 0],
                    "split_conditions": [0.5, l, r],
                    "default_left": [1, 0, 0],
                    "split_type": [0, 0, 0]
                })
            })
            .collect();
        let classifier = json!({
            "learner": {
                "gradient_booster": {
                    "name": "gbtree",
                    "model": { "tree_info": [0, 1, 2, 3], "trees": trees }
                },
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": "4",
                    "num_feature": "25"
                },
                "objective": { "name": "multi:softprob" }
            }
        });
        let scaler = json!({
            "mean": vec![0.0; FEATURE_COUNT],
            "scale": vec![1.0; FEATURE_COUNT],
            "feature_names": crime_risk_features::scaler::TRAINING_COLUMNS,
        });
        let labels = json!({
            "CRIME_CATEGORY": ["DRUGS/ALCOHOL", "PERSONAL", "PROPERTY", "SEXUAL"],
            "BORO_NM": ["BRONX", "BROOKLYN", "MANHATTAN", "QUEENS", "STATEN ISLAND"],
            "weekday": ["Friday", "Monday", "Saturday", "Sunday", "Thursday", "Tuesday", "Wednesday"],
            "season": ["Fall", "Spring", "Summer", "Winter"],
        });

        std::fs::write(dir.join(CLASSIFIER_FILE), classifier.to_string()).unwrap();
        std::fs::write(
            dir.join(crime_risk_features::encoder::SCALER_FILE),
            scaler.to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.join(crime_risk_features::encoder::LABEL_ENCODERS_FILE),
            labels.to_string(),
        )
        .unwrap();
        dir
    }

    #[test]
    fn load_predicts_from_model_directory() {
        let dir = write_model_dir("crime_risk_predictor_model_dir");
        let ctx = PredictionContext::load(&dir).unwrap();

        let q = UserQuery {
            observation_date: NaiveDate::from_ymd_opt(2024, 7, 15).unwrap(),
            observation_hour: 22,
            latitude: 40.7736,
            longitude: -73.9566,
            place_type: PlaceType::Park,
            age: 30,
            race: Race::White,
            gender: Gender::Male,
            precinct: Some(19),
            borough: Some(Borough::Manhattan),
        };
        let outcome = ctx.predict(&q).unwrap();

        assert_eq!(outcome.prediction.category, "PERSONAL");
        assert_eq!(outcome.features.get("is_night"), Some(1.0));
        assert_eq!(outcome.features.get("borough_encoded"), Some(2.0));
        let probabilities = outcome.prediction.probabilities.unwrap();
        assert_eq!(probabilities.len(), 4);
        let total: f64 = probabilities.iter().map(|p| p.probability).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(ctx.categories().len(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_reports_missing_artifact_file() {
        let dir = write_model_dir("crime_risk_predictor_missing_scaler");
        std::fs::remove_file(dir.join(crime_risk_features::encoder::SCALER_FILE)).unwrap();

        let err = PredictionContext::load(&dir).unwrap_err();
        assert!(matches!(
            err,
            PredictError::Artifact(ArtifactError::Io { ref path, .. })
                if path.ends_with(crime_risk_features::encoder::SCALER_FILE)
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    fn square(cx: f64, cy: f64, half: f64, properties: serde_json::Value) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": properties,
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [cx - half, cy - half],
                    [cx + half, cy - half],
                    [cx + half, cy + half],
                    [cx - half, cy + half],
                    [cx - half, cy - half],
                ]]
            }
        })
    }

    /// Precinct 14 around (40.75, -73.99); Manhattan only around
    /// (40.75, -73.99) too, so a point at (40.70, -73.90) has neither.
    fn locator() -> SpatialLocator {
        let precincts = json!({
            "type": "FeatureCollection",
            "features": [square(-73.99, 40.75, 0.01, json!({ "precinct": "14" }))],
        });
        let (x, y) = Projection::for_crs(Crs::Epsg2263).project(-73.99, 40.75);
        let boroughs = json!({
            "type": "FeatureCollection",
            "features": [square(x, y, 2000.0, json!({ "BoroName": "Manhattan" }))],
        });
        SpatialLocator::from_layers(
            BoundaryLayer::from_geojson_str(&precincts.to_string(), &datasets::precincts())
                .unwrap(),
            BoundaryLayer::from_geojson_str(&boroughs.to_string(), &datasets::boroughs()).unwrap(),
        )
    }

    #[test]
    fn predict_at_fills_location_from_locator() {
        let ctx = PredictionContext::from_parts(encoder(), fixed(1, None)).unwrap();
        let mut q = query();
        q.precinct = None;
        q.borough = None;
        let outcome = ctx.predict_at(&q, &locator()).unwrap();
        assert_eq!(outcome.precinct, 14);
        assert_eq!(outcome.borough, Borough::Manhattan);
        assert_eq!(outcome.prediction.category, "PERSONAL");
    }

    #[test]
    fn predict_at_refuses_point_outside_boundaries() {
        let ctx = PredictionContext::from_parts(encoder(), fixed(1, None)).unwrap();
        let mut q = query();
        q.latitude = 40.70;
        q.longitude = -73.90;
        let err = ctx.predict_at(&q, &locator()).unwrap_err();
        assert!(matches!(
            err,
            PredictError::LocationUnresolved {
                precinct: None,
                borough: None,
            }
        ));
    }
}
