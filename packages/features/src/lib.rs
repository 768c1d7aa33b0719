#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic feature encoding for the crime risk classifier.
//!
//! A [`UserQuery`](crime_risk_prediction_models::UserQuery) goes through
//! three stages:
//!
//! 1. [`derive`] computes calendar flags, season, age bucket, premise and
//!    the constant defaults for inputs the user never supplies.
//! 2. [`labels`] maps each categorical value to the integer its fitted label
//!    table assigned. Values a table never saw become 0 and are reported as
//!    an [`encoder::Substitution`].
//! 3. [`scaler`] standardizes the 25-field vector with the fitted
//!    statistics.
//!
//! The fitted tables and scaler live in a [`FeatureEncoder`], loaded once
//! from the model directory and shared read-only.

pub mod derive;
pub mod encoder;
pub mod labels;
pub mod scaler;

use std::path::PathBuf;

use thiserror::Error;

pub use encoder::{EncodedFeatures, FeatureEncoder, Substitution};

/// Errors loading fitted preprocessing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Artifact file couldn't be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Artifact JSON is malformed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scaler feature names don't match the expected column order.
    #[error("Scaler was fitted on a different column order: {found:?}")]
    FeatureOrder {
        /// Names found in the artifact.
        found: Vec<String>,
    },

    /// Artifact content is structurally invalid.
    #[error("Invalid artifact: {message}")]
    Invalid {
        /// Description of what's wrong.
        message: String,
    },
}
