//! Compile-time registry of boundary dataset descriptions.
//!
//! Each dataset is described by a TOML file under `datasets/` naming the
//! `GeoJSON` file, the feature property holding the value to return, and the
//! coordinate system the geometries are stored in.

use serde::Deserialize;

use crate::projection::Crs;

/// Description of one boundary dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryDataset {
    /// Unique identifier (`"precincts"`, `"boroughs"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// File name inside the boundaries directory.
    pub file: String,
    /// Feature property returned on a match.
    pub attribute: String,
    /// Coordinate system of the geometries.
    pub crs: Crs,
}

const DATASET_TOMLS: &[(&str, &str)] = &[
    ("precincts", include_str!("../datasets/precincts.toml")),
    ("boroughs", include_str!("../datasets/boroughs.toml")),
];

/// Returns the dataset registered under `id`.
///
/// # Panics
///
/// Panics if the embedded TOML for `id` is malformed (a development error
/// caught by the tests below).
#[must_use]
pub fn dataset(id: &str) -> Option<BoundaryDataset> {
    DATASET_TOMLS
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse boundary dataset '{name}': {e}"))
        })
}

/// The precinct dataset description.
///
/// # Panics
///
/// Panics if the embedded description is missing or malformed.
#[must_use]
pub fn precincts() -> BoundaryDataset {
    dataset("precincts").expect("precincts dataset is registered")
}

/// The borough dataset description.
///
/// # Panics
///
/// Panics if the embedded description is missing or malformed.
#[must_use]
pub fn boroughs() -> BoundaryDataset {
    dataset("boroughs").expect("boroughs dataset is registered")
}
