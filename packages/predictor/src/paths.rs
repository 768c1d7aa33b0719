//! Canonical file paths for the model and boundary data.
//!
//! Everything lives under a single data directory: `CRIME_RISK_DATA_DIR`
//! when set, otherwise the project root's `data/` directory.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CRIME_RISK_DATA_DIR";

/// Returns the workspace root directory.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`. Falls back to the
/// manifest directory itself if it has fewer than two ancestors.
#[must_use]
pub fn project_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .unwrap_or(manifest)
        .to_path_buf()
}

/// Returns the data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| project_root().join("data"), PathBuf::from)
}

/// Returns the `model/` directory holding the classifier, scaler and label
/// tables.
#[must_use]
pub fn model_dir() -> PathBuf {
    data_dir().join("model")
}

/// Returns the `boundaries/` directory holding the precinct and borough
/// `GeoJSON` files.
#[must_use]
pub fn boundaries_dir() -> PathBuf {
    data_dir().join("boundaries")
}
