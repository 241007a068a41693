//! PNEZD comma-delimited point files.
//!
//! One point per line: point number, northing, easting, elevation and
//! description, in that order. Blank lines and `#` comments are skipped.
//! Descriptions may contain commas, so a data line splits into at most
//! five fields.

use crate::error::FormatError;
use crate::waypoint::{sort_waypoints, Waypoint};

/// Parses PNEZD text into waypoints holding projected coordinates.
///
/// Northing lands in `lat` and easting in `lon`; callers convert to
/// geographic coordinates with [`crate::crs::projected_to_geographic`].
pub fn read_pnezd(text: &str) -> Result<Vec<Waypoint>, FormatError> {
    let mut pts = Vec::new();
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.splitn(5, ',').collect();
        let [name, n, e, ele, desc] = fields.as_slice() else {
            return Err(FormatError::BadPnezd { line: line.into() });
        };
        let (Ok(y), Ok(x), Ok(z)) = (
            n.trim().parse::<f64>(),
            e.trim().parse::<f64>(),
            ele.trim().parse::<f64>(),
        ) else {
            return Err(FormatError::BadPnezd { line: line.into() });
        };
        let mut p = Waypoint::new(x, y, z);
        let name = name.trim();
        if !name.is_empty() {
            p.name = Some(name.to_string());
        }
        let desc = desc.trim();
        if !desc.is_empty() {
            p.desc = Some(desc.to_string());
        }
        pts.push(p);
    }
    Ok(pts)
}

/// Formats projected waypoints as PNEZD text, numeric point names first.
///
/// Non-numeric names are dropped; the description column takes the
/// comment when present, else the description.
pub fn write_pnezd(pts: &[Waypoint]) -> String {
    let mut pts = pts.to_vec();
    sort_waypoints(&mut pts);
    let mut out = String::new();
    for p in &pts {
        let name = if p.numeric_name() >= 0 {
            format!("{}", p.numeric_name())
        } else {
            String::new()
        };
        out.push_str(&format!(
            "{name},{:.4},{:.4},{:.4},{}\n",
            p.lat,
            p.lon,
            p.ele,
            p.description()
        ));
    }
    out
}
