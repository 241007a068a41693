//! Spatial reference selection built on top of the `proj` crate.
//!
//! The projection math itself is delegated to PROJ; this module's own job
//! is to pick the correct intermediate geographic datum (NAD83 vs WGS84)
//! for a declared spatial reference and to carry elevation units through
//! the conversion.

use proj::Proj;

use crate::error::TransformError;
use crate::geodesy::RefFrame;
use crate::waypoint::Waypoint;

/// EPSG code of the NAD83 geographic CRS.
const EPSG_NAD83: u32 = 4269;
/// EPSG code of the WGS84 geographic CRS.
const EPSG_WGS84: u32 = 4326;

/// Linear unit of a projected CRS.
///
/// Declared explicitly by the caller so elevations convert correctly; the
/// unit of a bare definition string cannot always be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LinearUnit {
    #[default]
    Meter,
    UsSurveyFoot,
    InternationalFoot,
}

impl LinearUnit {
    /// Meters per unit.
    pub fn to_meters(self) -> f64 {
        match self {
            LinearUnit::Meter => 1.0,
            LinearUnit::UsSurveyFoot => 1200.0 / 3937.0,
            LinearUnit::InternationalFoot => 0.3048,
        }
    }
}

/// Representation of a coordinate reference system.
///
/// A CRS is stored internally as a definition string which can be an EPSG
/// identifier (`"EPSG:2225"`), a Proj4 definition or a WKT definition.
/// When created from an EPSG code the numeric value is retained so that
/// callers can inspect it if necessary.
#[derive(Debug, Clone, PartialEq)]
pub struct Crs {
    definition: String,
    epsg: Option<u32>,
    unit: LinearUnit,
}

impl Crs {
    /// Creates a new CRS from the given EPSG code.
    pub fn from_epsg(code: u32) -> Self {
        Self {
            definition: format!("EPSG:{code}"),
            epsg: Some(code),
            unit: LinearUnit::Meter,
        }
    }

    /// Creates a CRS from a Proj4 definition string.
    pub fn from_proj4(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            epsg: None,
            unit: LinearUnit::Meter,
        }
    }

    /// Creates a CRS from a WKT definition string.
    pub fn from_wkt(definition: &str) -> Self {
        Self {
            definition: definition.to_string(),
            epsg: None,
            unit: LinearUnit::Meter,
        }
    }

    /// Sets the linear unit used for planar coordinates and elevations.
    pub fn with_unit(mut self, unit: LinearUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Returns the EPSG code for this CRS, if available.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Returns the underlying definition string.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns the declared linear unit.
    pub fn linear_unit(&self) -> LinearUnit {
        self.unit
    }

    /// Geographic NAD83 (EPSG:4269).
    pub fn nad83_geographic() -> Self {
        Self::from_epsg(EPSG_NAD83)
    }

    /// Geographic WGS84 (EPSG:4326).
    pub fn wgs84_geographic() -> Self {
        Self::from_epsg(EPSG_WGS84)
    }

    /// Returns the geographic base frame this CRS is defined on.
    ///
    /// Recognizes the common NAD83 and WGS84 EPSG ranges used for U.S.
    /// survey work and falls back to name sniffing on Proj4/WKT
    /// definitions. Fails with [`TransformError::UnsupportedDatum`] when
    /// the base is neither.
    pub fn geographic_frame(&self) -> Result<RefFrame, TransformError> {
        if let Some(code) = self.epsg {
            match code {
                // Geographic NAD83 and its state-plane/UTM projections.
                EPSG_NAD83 | 4152 | 4759 => return Ok(RefFrame::Nad83),
                2225..=2230 | 26901..=26923 | 3310 | 6414..=6420 => return Ok(RefFrame::Nad83),
                // Geographic WGS84 and its UTM projections.
                EPSG_WGS84 | 32601..=32660 | 32701..=32760 => return Ok(RefFrame::Itrf2008),
                _ => {}
            }
        }
        let def = self.definition.to_ascii_uppercase();
        if def.contains("NAD83") || def.contains("NAD_1983") || def.contains("GRS80") {
            Ok(RefFrame::Nad83)
        } else if def.contains("WGS84") || def.contains("WGS 84") || def.contains("WGS_1984") {
            Ok(RefFrame::Itrf2008)
        } else {
            Err(TransformError::UnsupportedDatum {
                definition: self.definition.clone(),
            })
        }
    }

    fn geographic_base(&self) -> Result<(Crs, RefFrame), TransformError> {
        let frame = self.geographic_frame()?;
        let crs = match frame {
            RefFrame::Nad83 => Crs::nad83_geographic(),
            RefFrame::Itrf2008 => Crs::wgs84_geographic(),
        };
        Ok((crs, frame))
    }
}

/// Converts waypoints in place from `src` projected coordinates to the
/// geographic coordinates of the source datum. Elevations convert to
/// meters. Returns the geographic frame the points are now in.
pub fn projected_to_geographic(
    pts: &mut [Waypoint],
    src: &Crs,
) -> Result<RefFrame, TransformError> {
    let (geographic, frame) = src.geographic_base()?;
    let proj = Proj::new_known_crs(src.definition(), geographic.definition(), None)
        .map_err(|e| TransformError::Projection(e.to_string()))?;
    let to_meters = src.linear_unit().to_meters();
    for p in pts {
        let (lon, lat) = proj
            .convert((p.lon, p.lat))
            .map_err(|e| TransformError::Projection(e.to_string()))?;
        p.lon = lon;
        p.lat = lat;
        p.ele *= to_meters;
    }
    Ok(frame)
}

/// Converts waypoints in place from geographic coordinates of the target
/// datum to `dst` projected coordinates. Elevations convert from meters to
/// the target's linear unit. Returns the geographic frame the points were
/// expected in.
pub fn geographic_to_projected(
    pts: &mut [Waypoint],
    dst: &Crs,
) -> Result<RefFrame, TransformError> {
    let (geographic, frame) = dst.geographic_base()?;
    let proj = Proj::new_known_crs(geographic.definition(), dst.definition(), None)
        .map_err(|e| TransformError::Projection(e.to_string()))?;
    let to_meters = dst.linear_unit().to_meters();
    for p in pts {
        let (x, y) = proj
            .convert((p.lon, p.lat))
            .map_err(|e| TransformError::Projection(e.to_string()))?;
        p.lon = x;
        p.lat = y;
        p.ele /= to_meters;
    }
    Ok(frame)
}
