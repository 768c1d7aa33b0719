#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Classifier abstraction for crime risk prediction.
//!
//! The prediction pipeline talks to the model through [`Classifier`], so the
//! artifact format stays an implementation detail. [`xgboost`] provides the
//! production implementation, evaluating a gradient-boosted tree ensemble
//! saved with XGBoost's JSON model format.

pub mod xgboost;

use std::path::PathBuf;

use thiserror::Error;

pub use xgboost::GradientBoostedTrees;

/// Errors from loading or invoking a classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model file couldn't be read.
    #[error("Failed to read model {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Model JSON is malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model uses a feature this evaluator doesn't implement.
    #[error("Unsupported model: {message}")]
    Unsupported {
        /// What isn't supported.
        message: String,
    },

    /// Model structure is inconsistent.
    #[error("Invalid model: {message}")]
    Invalid {
        /// Description of the inconsistency.
        message: String,
    },

    /// Input vector doesn't have the number of features the model expects.
    #[error("Expected {expected} features, got {actual}")]
    FeatureCount {
        /// Features the model was trained on.
        expected: usize,
        /// Features supplied.
        actual: usize,
    },
}

/// A fitted multi-class model.
///
/// Implementations are read-only after construction and may be shared
/// between threads.
pub trait Classifier: Send + Sync {
    /// Number of input features the model expects.
    fn num_features(&self) -> usize;

    /// Number of classes the model predicts.
    fn num_classes(&self) -> usize;

    /// Predicts the class index for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::FeatureCount`] if `features` has the wrong
    /// length.
    fn classify(&self, features: &[f64]) -> Result<usize, ClassifierError>;

    /// Per-class probabilities for `features`, indexed by class.
    ///
    /// Models that can't produce probabilities return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::FeatureCount`] if `features` has the wrong
    /// length.
    fn classify_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ClassifierError> {
        self.check_features(features)?;
        Ok(None)
    }

    /// Fails unless `features` has [`Classifier::num_features`] entries.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::FeatureCount`] on a length mismatch.
    fn check_features(&self, features: &[f64]) -> Result<(), ClassifierError> {
        let expected = self.num_features();
        if features.len() == expected {
            Ok(())
        } else {
            Err(ClassifierError::FeatureCount {
                expected,
                actual: features.len(),
            })
        }
    }
}
