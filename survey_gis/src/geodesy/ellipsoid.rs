//! Reference ellipsoids and geodetic/Cartesian point conversions.

use crate::error::TransformError;

/// Convergence tolerance for the geodetic latitude solve (radians).
const LAT_TOLERANCE: f64 = 1.0e-12;

/// Safety bound on latitude iterations. Real-world coordinates settle in
/// three or four passes; the bound exists to turn a pathological input
/// into an error instead of a hang.
const LAT_ITERATION_LIMIT: u32 = 10;

/// Geodetic reference frame a coordinate is expressed in.
///
/// The frame is carried on every [`GeodeticPoint`] because the direction
/// of the datum shift depends on it; it is never implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RefFrame {
    /// ITRF2008, taken to be equivalent to WGS84 for GPS-derived points.
    Itrf2008,
    /// NAD83(2011/CORS96), the frame of U.S. survey control.
    Nad83,
}

impl std::fmt::Display for RefFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefFrame::Itrf2008 => write!(f, "ITRF2008"),
            RefFrame::Nad83 => write!(f, "NAD83"),
        }
    }
}

/// Immutable reference-ellipsoid parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Semi-major axis (meters).
    pub a: f64,
    /// Flattening.
    pub f: f64,
    /// Semi-minor axis (meters).
    pub b: f64,
    /// First eccentricity squared.
    pub e2: f64,
}

impl Ellipsoid {
    fn from_a_f(a: f64, f: f64) -> Self {
        Self {
            a,
            f,
            b: a * (1.0 - f),
            e2: 2.0 * f - f * f,
        }
    }

    /// GRS80 ellipsoid underlying NAD83.
    pub fn grs80() -> Self {
        Self::from_a_f(6378137.0, 1.0 / 298.257222101)
    }

    /// WGS84 ellipsoid underlying ITRF/WGS84 frames.
    pub fn wgs84() -> Self {
        Self::from_a_f(6378137.0, 1.0 / 298.257223563)
    }

    /// The ellipsoid conventionally paired with a reference frame.
    pub fn for_frame(frame: RefFrame) -> Self {
        match frame {
            RefFrame::Nad83 => Self::grs80(),
            RefFrame::Itrf2008 => Self::wgs84(),
        }
    }
}

/// A longitude/latitude/height triple in a named reference frame.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeodeticPoint {
    /// Longitude in decimal degrees, negative west.
    pub lon: f64,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Ellipsoidal height in meters.
    pub height: f64,
    /// Frame the coordinates are referenced to.
    pub frame: RefFrame,
}

impl GeodeticPoint {
    pub fn new(lon: f64, lat: f64, height: f64, frame: RefFrame) -> Self {
        Self {
            lon,
            lat,
            height,
            frame,
        }
    }
}

/// ECEF Cartesian coordinates in meters.
///
/// Ephemeral: produced and consumed within a single transform call, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Converts geodetic coordinates to ECEF Cartesian coordinates.
///
/// Closed-form conversion using the prime-vertical radius of curvature;
/// no iteration and no failure mode.
pub fn geodetic_to_cartesian(p: &GeodeticPoint, ell: &Ellipsoid) -> CartesianPoint {
    let lon = p.lon.to_radians();
    let lat = p.lat.to_radians();
    let n = ell.a / (1.0 - ell.e2 * lat.sin() * lat.sin()).sqrt();
    CartesianPoint {
        x: (n + p.height) * lat.cos() * lon.cos(),
        y: (n + p.height) * lat.cos() * lon.sin(),
        z: (n * (1.0 - ell.e2) + p.height) * lat.sin(),
    }
}

/// Converts ECEF Cartesian coordinates to geodetic coordinates on `ell`.
///
/// The latitude has no closed form and is solved by fixed-point iteration
/// seeded at zero; an estimate is accepted when successive values agree
/// within 1e-12 radians. Fails with [`TransformError::NonConvergence`] if
/// the solve exceeds its iteration bound.
pub fn cartesian_to_geodetic(
    v: &CartesianPoint,
    ell: &Ellipsoid,
    frame: RefFrame,
) -> Result<GeodeticPoint, TransformError> {
    let lon = v.y.atan2(v.x);
    let p = v.x.hypot(v.y);

    let mut last_lat = 0.0_f64;
    let mut i = 0;
    let lat = loop {
        i += 1;

        // New latitude from the previous estimate.
        let n = ell.a / (1.0 - ell.e2 * last_lat.sin() * last_lat.sin()).sqrt();
        let lat = (v.z / p / (1.0 - ell.e2 * n * last_lat.cos() / p)).atan();

        if (lat - last_lat).abs() < LAT_TOLERANCE {
            break lat;
        }
        if i > LAT_ITERATION_LIMIT {
            return Err(TransformError::NonConvergence {
                limit: LAT_ITERATION_LIMIT,
            });
        }
        last_lat = lat;
    };

    let h = p / lat.cos() - ell.a / (1.0 - ell.e2 * lat.sin() * lat.sin()).sqrt();
    Ok(GeodeticPoint::new(
        lon.to_degrees(),
        lat.to_degrees(),
        h,
        frame,
    ))
}
