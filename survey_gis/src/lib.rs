//! Core library for the survey map archive tools.
//!
//! Three engines live here: the geodetic transform pipeline that moves
//! GPS waypoints between ITRF2008/WGS84 and NAD83 ([`geodesy`] and
//! [`crs`]), the archive search-query parser and section encoder
//! ([`query`]), and the line-traverse calculator ([`traverse`]). The
//! [`io`] module reads and writes the PNEZD and GPX point formats the
//! transform pipeline is normally fed from.

pub mod crs;
pub mod error;
pub mod geodesy;
pub mod io;
pub mod query;
pub mod traverse;
pub mod waypoint;

pub use crs::{Crs, LinearUnit};
pub use error::{BadCommand, FormatError, ParseError, TransformError};
pub use geodesy::{DatumShift, DisplacementGrid, GeodeticPoint, HelmertParams, RefFrame};
pub use query::{build_query_plan, parse_search, QueryPlan, Search};
pub use traverse::{process_line_data, TraverseResult};
pub use waypoint::Waypoint;
