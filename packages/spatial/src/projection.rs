//! Coordinate systems used by the boundary datasets.
//!
//! The borough dataset is published in NY State Plane Long Island
//! (EPSG:2263), a Lambert Conformal Conic projection on GRS80 with
//! coordinates in US survey feet. Points are projected forward with the
//! ellipsoidal formulas from Snyder, *Map Projections: A Working Manual*
//! (USGS PP 1395), pp. 107-109.

use serde::Deserialize;

/// Meters per US survey foot.
const US_SURVEY_FOOT: f64 = 1200.0 / 3937.0;

/// GRS80 semi-major axis in meters.
const GRS80_A: f64 = 6_378_137.0;
/// GRS80 inverse flattening.
const GRS80_INV_F: f64 = 298.257_222_101;

/// Coordinate system of a boundary dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Longitude/latitude in decimal degrees (EPSG:4326).
    Wgs84,
    /// NAD83 / New York Long Island, US survey feet.
    Epsg2263,
}

/// Forward projection from longitude/latitude into a dataset's CRS.
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    Identity,
    Lambert(LambertConformalConic),
}

impl Projection {
    #[must_use]
    pub fn for_crs(crs: Crs) -> Self {
        match crs {
            Crs::Wgs84 => Self::Identity,
            Crs::Epsg2263 => Self::Lambert(LambertConformalConic::ny_long_island()),
        }
    }

    /// Projects `(lon, lat)` to `(x, y)`.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::Identity => (lon, lat),
            Self::Lambert(lcc) => lcc.project(lon, lat),
        }
    }
}

/// Lambert Conformal Conic with two standard parallels.
#[derive(Debug, Clone, Copy)]
pub struct LambertConformalConic {
    e: f64,
    n: f64,
    af: f64,
    rho0: f64,
    lon0: f64,
    false_easting: f64,
    false_northing: f64,
    unit: f64,
}

impl LambertConformalConic {
    /// Builds a projection on GRS80. Angles are in degrees, false origin and
    /// `unit` (meters per output unit) in meters.
    #[must_use]
    pub fn new(
        lat1: f64,
        lat2: f64,
        lat0: f64,
        lon0: f64,
        false_easting: f64,
        false_northing: f64,
        unit: f64,
    ) -> Self {
        let f = 1.0 / GRS80_INV_F;
        let e = (2.0 * f - f * f).sqrt();

        let (phi1, phi2, phi0) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians());
        let m1 = m(phi1, e);
        let m2 = m(phi2, e);
        let t1 = t(phi1, e);
        let t2 = t(phi2, e);
        let t0 = t(phi0, e);

        let n = (m1.ln() - m2.ln()) / (t1.ln() - t2.ln());
        let big_f = m1 / (n * t1.powf(n));
        let af = GRS80_A * big_f;
        let rho0 = af * t0.powf(n);

        Self {
            e,
            n,
            af,
            rho0,
            lon0: lon0.to_radians(),
            false_easting,
            false_northing,
            unit,
        }
    }

    /// EPSG:2263 parameters: standard parallels 41°02' and 40°40', origin
    /// 40°10'N 74°W, false easting 300 000 m.
    #[must_use]
    pub fn ny_long_island() -> Self {
        Self::new(
            41.0 + 2.0 / 60.0,
            40.0 + 40.0 / 60.0,
            40.0 + 10.0 / 60.0,
            -74.0,
            300_000.0,
            0.0,
            US_SURVEY_FOOT,
        )
    }

    /// Projects `(lon, lat)` in degrees to `(x, y)` in output units.
    #[must_use]
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let rho = self.af * t(lat.to_radians(), self.e).powf(self.n);
        let theta = self.n * (lon.to_radians() - self.lon0);
        let x = self.false_easting + rho * theta.sin();
        let y = self.false_northing + self.rho0 - rho * theta.cos();
        (x / self.unit, y / self.unit)
    }
}

fn m(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    phi.cos() / e.mul_add(-(e * s * s), 1.0).sqrt()
}

fn t(phi: f64, e: f64) -> f64 {
    let s = phi.sin();
    (std::f64::consts::FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - e * s) / (1.0 + e * s)).powf(e / 2.0)
}
