#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Point-in-polygon attribution of NYPD precincts and boroughs.
//!
//! Boundary files are loaded once into R-tree indexes. A lookup returns the
//! first polygon in file order that contains the point, so overlapping or
//! duplicated features resolve deterministically.

pub mod datasets;
pub mod projection;

use std::path::{Path, PathBuf};

use crime_risk_prediction_models::Borough;
use geo::{BoundingRect, Contains, MultiPolygon};
use geojson::{Feature, GeoJson};
use rstar::{AABB, RTree, RTreeObject};
use serde::Serialize;
use thiserror::Error;

use crate::datasets::BoundaryDataset;
use crate::projection::Projection;

/// Errors loading boundary data.
#[derive(Debug, Error)]
pub enum LocatorError {
    /// Boundary file couldn't be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Boundary file isn't valid `GeoJSON`.
    #[error("Failed to parse {dataset} boundaries: {message}")]
    Parse {
        /// Dataset id.
        dataset: String,
        /// Parser message.
        message: String,
    },

    /// Boundary file contains no usable polygons.
    #[error("No usable polygons in {dataset} boundaries")]
    Empty {
        /// Dataset id.
        dataset: String,
    },
}

/// Result of locating a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Containing NYPD precinct.
    pub precinct: Option<u32>,
    /// Containing borough.
    pub borough: Option<Borough>,
}

impl Location {
    /// Whether both precinct and borough were found.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.precinct.is_some() && self.borough.is_some()
    }

    /// Both attributes, or `None` if either is missing.
    #[must_use]
    pub const fn resolved(&self) -> Option<(u32, Borough)> {
        match (self.precinct, self.borough) {
            (Some(p), Some(b)) => Some((p, b)),
            _ => None,
        }
    }
}

/// A boundary polygon stored in the R-tree with its attribute value.
struct BoundaryEntry {
    /// Position of the feature in its source file.
    ordinal: usize,
    value: serde_json::Value,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// One indexed boundary dataset.
pub struct BoundaryLayer {
    id: String,
    projection: Projection,
    tree: RTree<BoundaryEntry>,
}

impl std::fmt::Debug for BoundaryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryLayer")
            .field("id", &self.id)
            .field("projection", &self.projection)
            .field("polygons", &self.tree.size())
            .finish()
    }
}

impl BoundaryLayer {
    /// Reads `dataset.file` from `dir` and indexes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read, isn't a `GeoJSON`
    /// `FeatureCollection`, or contains no polygon features.
    pub fn load(dir: &Path, dataset: &BoundaryDataset) -> Result<Self, LocatorError> {
        let path = dir.join(&dataset.file);
        let text = std::fs::read_to_string(&path).map_err(|source| LocatorError::Io {
            path: path.clone(),
            source,
        })?;
        let layer = Self::from_geojson_str(&text, dataset)?;
        log::info!(
            "Loaded {} {} boundaries from {}",
            layer.len(),
            dataset.id,
            path.display()
        );
        Ok(layer)
    }

    /// Indexes a `GeoJSON` `FeatureCollection`.
    ///
    /// Features without a polygon geometry or without `dataset.attribute`
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` isn't a `FeatureCollection` or no feature
    /// is usable.
    pub fn from_geojson_str(text: &str, dataset: &BoundaryDataset) -> Result<Self, LocatorError> {
        let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| LocatorError::Parse {
            dataset: dataset.id.clone(),
            message: e.to_string(),
        })?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(LocatorError::Parse {
                dataset: dataset.id.clone(),
                message: "expected a FeatureCollection".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(collection.features.len());
        for (ordinal, feature) in collection.features.into_iter().enumerate() {
            let Some(value) = feature.property(&dataset.attribute).cloned() else {
                log::warn!(
                    "Skipping {} feature {ordinal}: no '{}' property",
                    dataset.id,
                    dataset.attribute
                );
                continue;
            };
            let Some(polygon) = feature_to_multipolygon(feature) else {
                log::warn!(
                    "Skipping {} feature {ordinal}: not a polygon",
                    dataset.id
                );
                continue;
            };

            entries.push(BoundaryEntry {
                ordinal,
                value,
                envelope: compute_envelope(&polygon),
                polygon,
            });
        }

        if entries.is_empty() {
            return Err(LocatorError::Empty {
                dataset: dataset.id.clone(),
            });
        }

        Ok(Self {
            id: dataset.id.clone(),
            projection: Projection::for_crs(dataset.crs),
            tree: RTree::bulk_load(entries),
        })
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Attribute value of the first feature (in file order) containing the
    /// point.
    #[must_use]
    pub fn lookup(&self, lat: f64, lon: f64) -> Option<&serde_json::Value> {
        let (x, y) = self.projection.project(lon, lat);
        let point = geo::Point::new(x, y);
        let query_env = AABB::from_point([x, y]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .min_by_key(|entry| entry.ordinal)
            .map(|entry| &entry.value)
    }
}

/// Precinct and borough lookup for WGS84 points.
#[derive(Debug)]
pub struct SpatialLocator {
    precincts: BoundaryLayer,
    boroughs: BoundaryLayer,
}

impl SpatialLocator {
    /// Loads both boundary datasets from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if either dataset fails to load.
    pub fn load(dir: &Path) -> Result<Self, LocatorError> {
        let precincts = BoundaryLayer::load(dir, &datasets::precincts())?;
        let boroughs = BoundaryLayer::load(dir, &datasets::boroughs())?;
        Ok(Self::from_layers(precincts, boroughs))
    }

    #[must_use]
    pub const fn from_layers(precincts: BoundaryLayer, boroughs: BoundaryLayer) -> Self {
        Self {
            precincts,
            boroughs,
        }
    }

    /// Finds the precinct and borough containing `(lat, lon)`.
    ///
    /// Either attribute is `None` when no polygon contains the point or the
    /// matched value can't be interpreted.
    #[must_use]
    pub fn locate(&self, lat: f64, lon: f64) -> Location {
        let precinct = self.precincts.lookup(lat, lon).and_then(|value| {
            let parsed = precinct_number(value);
            if parsed.is_none() {
                log::warn!("Unrecognized precinct value {value}");
            }
            parsed
        });
        let borough = self.boroughs.lookup(lat, lon).and_then(|value| {
            let parsed = value.as_str().and_then(|name| name.trim().parse().ok());
            if parsed.is_none() {
                log::warn!("Unrecognized borough value {value}");
            }
            parsed
        });

        log::debug!("Located ({lat}, {lon}): precinct={precinct:?} borough={borough:?}");

        Location { precinct, borough }
    }
}

/// Reads a precinct number stored as either a JSON number or a string.
fn precinct_number(value: &serde_json::Value) -> Option<u32> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.fract() != 0.0 || !(0.0..=f64::from(u32::MAX)).contains(&n) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some(n as u32)
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_to_multipolygon(feature: Feature) -> Option<MultiPolygon<f64>> {
    let geom = feature.geometry?;
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
