//! Survey waypoints shared by the GPX and PNEZD representations.

/// A survey waypoint.
///
/// The coordinate slots hold longitude/latitude in decimal degrees while
/// the point is geographic and easting/northing while it is projected; the
/// conversion helpers in [`crate::crs`] move points between the two. All
/// annotation fields are optional.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Waypoint {
    /// Longitude in decimal degrees (negative west), or easting.
    pub lon: f64,
    /// Latitude in decimal degrees, or northing.
    pub lat: f64,
    /// Elevation. Meters while geographic, CRS linear units while projected.
    pub ele: f64,
    /// Waypoint timestamp (ISO 8601).
    pub time: Option<String>,
    /// Point name, usually a point number.
    pub name: Option<String>,
    /// Comment.
    pub cmt: Option<String>,
    /// Description.
    pub desc: Option<String>,
    /// Map symbol.
    pub sym: Option<String>,
    /// Waypoint type.
    pub wpt_type: Option<String>,
    /// Averaging sample count from the Garmin waypoint extension.
    pub samples: Option<u32>,
}

impl Waypoint {
    /// Creates a bare waypoint with no annotations.
    pub fn new(lon: f64, lat: f64, ele: f64) -> Self {
        Self {
            lon,
            lat,
            ele,
            ..Self::default()
        }
    }

    /// Numeric value of the point name, or a sentinel that sorts first.
    pub fn numeric_name(&self) -> i64 {
        match self.name.as_deref() {
            Some(n) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => {
                n.parse().unwrap_or(-1)
            }
            _ => -1,
        }
    }

    /// Output description: the comment when present, else the description.
    pub fn description(&self) -> &str {
        self.cmt
            .as_deref()
            .or(self.desc.as_deref())
            .unwrap_or_default()
    }
}

/// Orders waypoints by numeric point name, unnamed points first.
///
/// The sort is stable so points without numeric names keep their relative
/// order.
pub fn sort_waypoints(pts: &mut [Waypoint]) {
    pts.sort_by_key(Waypoint::numeric_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_name_parses_digits_only() {
        let mut p = Waypoint::new(0.0, 0.0, 0.0);
        assert_eq!(p.numeric_name(), -1);
        p.name = Some("4501".to_string());
        assert_eq!(p.numeric_name(), 4501);
        p.name = Some("CP-1".to_string());
        assert_eq!(p.numeric_name(), -1);
    }

    #[test]
    fn sort_keeps_unnamed_points_in_order() {
        let mut a = Waypoint::new(1.0, 0.0, 0.0);
        a.desc = Some("first".to_string());
        let mut b = Waypoint::new(2.0, 0.0, 0.0);
        b.desc = Some("second".to_string());
        let mut c = Waypoint::new(3.0, 0.0, 0.0);
        c.name = Some("2".to_string());
        let mut d = Waypoint::new(4.0, 0.0, 0.0);
        d.name = Some("1".to_string());

        let mut pts = vec![c, a.clone(), d, b.clone()];
        sort_waypoints(&mut pts);
        assert_eq!(pts[0].desc.as_deref(), Some("first"));
        assert_eq!(pts[1].desc.as_deref(), Some("second"));
        assert_eq!(pts[2].name.as_deref(), Some("1"));
        assert_eq!(pts[3].name.as_deref(), Some("2"));
    }

    #[test]
    fn description_prefers_comment() {
        let mut p = Waypoint::new(0.0, 0.0, 0.0);
        p.desc = Some("desc".to_string());
        assert_eq!(p.description(), "desc");
        p.cmt = Some("cmt".to_string());
        assert_eq!(p.description(), "cmt");
    }
}
