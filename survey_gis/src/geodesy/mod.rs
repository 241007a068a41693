//! Geodetic transform engine.
//!
//! Converts survey waypoints between the ITRF2008/WGS84 and NAD83
//! reference frames: closed-form and iterative ellipsoid conversions, the
//! time-dependent Helmert similarity transform, and the HTDP displacement
//! grid that moves NAD83 coordinates between epochs.

pub mod ellipsoid;
pub mod grid;
pub mod helmert;

pub use ellipsoid::{
    cartesian_to_geodetic, geodetic_to_cartesian, CartesianPoint, Ellipsoid, GeodeticPoint,
    RefFrame,
};
pub use grid::{DisplacementGrid, GridDims};
pub use helmert::{add_enu_displacement, subtract_enu_displacement, DatumShift, HelmertParams};
