//! Angle and bearing parsing/formatting for the traverse calculator.
//!
//! Field notes write angles as packed DMS (`ddd.mmss`, clockwise
//! positive) and bearings as a quadrant code plus `dd.mmss`. Internally
//! all angles are radians, counterclockwise positive from the east axis,
//! so the parsers negate on the way in and the formatters negate on the
//! way out.

use once_cell::sync::Lazy;
use regex::Regex;

static DMS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-)?(\d{1,3})\.(\d{2})(\d{2})$").unwrap());
static BEARING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})\.(\d{2})(\d{2})$").unwrap());

const QUADRANTS: [&str; 4] = ["NE", "SE", "SW", "NW"];

/// Parses a signed packed-DMS angle (`'ddd.mmss'`, clockwise positive)
/// to counterclockwise radians.
pub fn dms_angle(text: &str) -> Option<f64> {
    let caps = DMS_RE.captures(text)?;
    let deg: u32 = caps[2].parse().ok()?;
    let min: u32 = caps[3].parse().ok()?;
    let sec: u32 = caps[4].parse().ok()?;
    if deg >= 360 || min >= 60 || sec >= 60 {
        return None;
    }
    let mut deg = f64::from(deg) + f64::from(min) / 60.0 + f64::from(sec) / 3600.0;
    if caps.get(1).is_some() {
        deg = -deg;
    }
    Some((-deg).to_radians())
}

/// Parses a quadrant bearing (`quad` 1-4, `'dd.mmss'`) to radians
/// counterclockwise from the positive x-axis.
pub fn bearing_angle(quad: u32, text: &str) -> Option<f64> {
    if !(1..=4).contains(&quad) {
        return None;
    }
    let caps = BEARING_RE.captures(text)?;
    let deg: u32 = caps[1].parse().ok()?;
    let min: u32 = caps[2].parse().ok()?;
    let sec: u32 = caps[3].parse().ok()?;
    if deg > 90 || min >= 60 || sec >= 60 {
        return None;
    }
    let deg = f64::from(deg) + f64::from(min) / 60.0 + f64::from(sec) / 3600.0;
    let quad = quad as i32;
    let a = if quad % 2 == 1 {
        // Quadrants 1 (NE) and 3 (SW) measure from north/south toward the
        // bearing, which runs against the math direction.
        f64::from((2 - quad) * 90) - deg
    } else {
        f64::from((1 - quad) * 90) + deg
    };
    Some(a.to_radians())
}

/// Splits decimal degrees into rounded degrees, minutes and seconds,
/// carrying seconds that round to 60 up through minutes and degrees.
fn split_dms(deg: f64, sec_decimals: usize) -> (i64, i64, f64) {
    let minutes = (deg * 60.0).rem_euclid(60.0);
    let seconds = (minutes * 60.0).rem_euclid(60.0);
    let mut d = (deg - minutes / 60.0).round() as i64;
    let mut m = (minutes - seconds / 60.0).round() as i64;
    let scale = 10f64.powi(sec_decimals as i32);
    let mut s = (seconds * scale).round() / scale;
    if (s - 60.0).abs() < 0.1f64.powi(sec_decimals as i32) {
        s = 0.0;
        m += 1;
    }
    if m == 60 {
        m = 0;
        d += 1;
    }
    (d, m, s)
}

/// Formats an angle in radians as a quadrant bearing, e.g. `N45°00'00.0"E`.
pub fn bearing_string(a: f64, sec_decimals: usize) -> String {
    let azi = (90.0 - a.to_degrees()).rem_euclid(360.0);
    let quad = (azi / 90.0) as usize % 4;
    let deg = if quad % 2 == 1 {
        90.0 - azi.rem_euclid(90.0)
    } else {
        azi.rem_euclid(90.0)
    };
    let (d, m, s) = split_dms(deg, sec_decimals);
    let q = QUADRANTS[quad];
    format!(
        "{}{}\u{b0}{:02}'{:0w$.p$}\"{}",
        &q[..1],
        d,
        m,
        s,
        &q[1..],
        w = sec_decimals + 3,
        p = sec_decimals
    )
}

/// Formats an angle in radians as signed DMS, clockwise positive (so a
/// counterclockwise-positive input prints with a leading minus).
pub fn dms_string(a: f64, sec_decimals: usize) -> String {
    let sign = if a < 0.0 { "" } else { "-" };
    let (d, m, s) = split_dms(a.abs().to_degrees(), sec_decimals);
    format!(
        "{}{}\u{b0}{:02}'{:0w$.p$}\"",
        sign,
        d,
        m,
        s,
        w = sec_decimals + 3,
        p = sec_decimals
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn dms_angle_parses_packed_dms() {
        // Clockwise 90 degrees comes out as -pi/2.
        let a = dms_angle("90.0000").unwrap();
        assert!((a + PI / 2.0).abs() < 1e-12);
        let a = dms_angle("-90.0000").unwrap();
        assert!((a - PI / 2.0).abs() < 1e-12);
        // 12 deg 30 min 30 sec.
        let a = dms_angle("12.3030").unwrap();
        assert!((a + (12.0_f64 + 30.0 / 60.0 + 30.0 / 3600.0).to_radians()).abs() < 1e-12);
    }

    #[test]
    fn dms_angle_rejects_malformed() {
        assert!(dms_angle("360.0000").is_none());
        assert!(dms_angle("10.6000").is_none());
        assert!(dms_angle("10.0060").is_none());
        assert!(dms_angle("10.000").is_none());
        assert!(dms_angle("").is_none());
    }

    #[test]
    fn bearing_angle_quadrants() {
        // N45E is 45 degrees from east axis.
        let a = bearing_angle(1, "45.0000").unwrap();
        assert!((a - PI / 4.0).abs() < 1e-12);
        // Due north.
        let a = bearing_angle(1, "00.0000").unwrap();
        assert!((a - PI / 2.0).abs() < 1e-12);
        // S45E points into the fourth math quadrant.
        let a = bearing_angle(2, "45.0000").unwrap();
        assert!((a + PI / 4.0).abs() < 1e-12);
        // S45W.
        let a = bearing_angle(3, "45.0000").unwrap();
        assert!((a + 3.0 * PI / 4.0).abs() < 1e-12);
        // N45W.
        let a = bearing_angle(4, "45.0000").unwrap();
        assert!((a - 3.0 * PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn bearing_angle_rejects_malformed() {
        assert!(bearing_angle(0, "45.0000").is_none());
        assert!(bearing_angle(5, "45.0000").is_none());
        assert!(bearing_angle(1, "91.0000").is_none());
        assert!(bearing_angle(1, "45.6000").is_none());
    }

    #[test]
    fn bearing_round_trip() {
        for (quad, brg) in [(1, "45.3015"), (2, "12.0000"), (3, "89.5959"), (4, "00.0001")] {
            let a = bearing_angle(quad, brg).unwrap();
            let s = bearing_string(a, 1);
            let q = QUADRANTS[(quad - 1) as usize];
            assert!(s.starts_with(&q[..1]) && s.ends_with(&q[1..]), "{s}");
        }
        assert_eq!(bearing_string(PI / 4.0, 1), "N45\u{b0}00'00.0\"E");
    }

    #[test]
    fn seconds_carry_through_minutes_and_degrees() {
        // 89 deg 59 min 59.97 sec must carry all the way to 90 degrees.
        let a = (89.0_f64 + 59.0 / 60.0 + 59.97 / 3600.0).to_radians();
        assert_eq!(dms_string(-a, 1), "90\u{b0}00'00.0\"");
        // North-ish bearing just shy of due north.
        let b = (90.0_f64 - 89.0 - 59.0 / 60.0 - 59.97 / 3600.0).to_radians();
        assert_eq!(bearing_string(b, 1), "N90\u{b0}00'00.0\"E");
    }

    #[test]
    fn dms_string_sign_convention() {
        // Counterclockwise positive prints clockwise negative.
        assert_eq!(dms_string(PI / 2.0, 1), "-90\u{b0}00'00.0\"");
        assert_eq!(dms_string(-PI / 2.0, 1), "90\u{b0}00'00.0\"");
    }
}
