//! GPX 1.1 waypoint files.
//!
//! Reads the waypoint subset of GPX (position, elevation, time, name,
//! comment, description, symbol, type and the Garmin averaging sample
//! count) and writes it back out. Tags are matched by local name so
//! documents with or without the GPX default namespace both parse.

use std::fmt::Write as _;

use chrono::{SecondsFormat, Utc};
use roxmltree::Document;

use crate::error::{FormatError, TransformError};
use crate::geodesy::{DatumShift, GeodeticPoint, RefFrame};
use crate::waypoint::{sort_waypoints, Waypoint};

/// Symbol written for waypoints that carry none.
const WPT_SYMBOL: &str = "Flag, Red";

/// Fixed attribution link written into the document metadata.
const METADATA_LINK: &str = "https://hummaps.org/";
const METADATA_LINK_TEXT: &str = "Hummaps";

/// Parses GPX text into waypoints with geographic coordinates.
pub fn read_gpx(text: &str) -> Result<Vec<Waypoint>, FormatError> {
    let doc = Document::parse(text).map_err(|e| FormatError::BadGpx(e.to_string()))?;
    let mut pts = Vec::new();
    for wpt in doc
        .descendants()
        .filter(|n| n.tag_name().name() == "wpt")
    {
        let lat: f64 = wpt
            .attribute("lat")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| FormatError::BadGpx("wpt missing lat attribute".into()))?;
        let lon: f64 = wpt
            .attribute("lon")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| FormatError::BadGpx("wpt missing lon attribute".into()))?;

        let mut p = Waypoint::new(lon, lat, 0.0);
        for child in wpt.children().filter(|c| c.is_element()) {
            let text = child.text().map(str::to_string);
            match child.tag_name().name() {
                "ele" => {
                    p.ele = child
                        .text()
                        .and_then(|t| t.trim().parse().ok())
                        .ok_or_else(|| FormatError::BadGpx("bad wpt elevation".into()))?;
                }
                "time" => p.time = text,
                "name" => p.name = text,
                "cmt" => p.cmt = text,
                "desc" => p.desc = text,
                "sym" => p.sym = text,
                "type" => p.wpt_type = text,
                "extensions" => {
                    p.samples = child
                        .descendants()
                        .find(|n| n.tag_name().name() == "Samples")
                        .and_then(|n| n.text())
                        .and_then(|t| t.trim().parse().ok());
                }
                _ => {}
            }
        }
        pts.push(p);
    }
    Ok(pts)
}

/// Shifts geographic waypoints from ITRF2008/WGS84 into NAD83.
///
/// Positions shift at zero height; elevations pass through untouched, as
/// GPS elevations are handled separately from the horizontal datum.
pub fn shift_waypoints_to_nad83(
    pts: &mut [Waypoint],
    shift: &DatumShift,
    epoch: f64,
) -> Result<(), TransformError> {
    for p in pts {
        let g = GeodeticPoint::new(p.lon, p.lat, 0.0, RefFrame::Itrf2008);
        let q = shift.itrf_to_nad83(&g, epoch)?;
        p.lon = q.lon;
        p.lat = q.lat;
    }
    Ok(())
}

/// Shifts geographic waypoints from NAD83 back into ITRF2008/WGS84.
pub fn shift_waypoints_to_itrf(
    pts: &mut [Waypoint],
    shift: &DatumShift,
    epoch: f64,
) -> Result<(), TransformError> {
    for p in pts {
        let g = GeodeticPoint::new(p.lon, p.lat, 0.0, RefFrame::Nad83);
        let q = shift.nad83_to_itrf(&g, epoch)?;
        p.lon = q.lon;
        p.lat = q.lat;
    }
    Ok(())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Formats geographic waypoints as a GPX 1.1 document.
///
/// Waypoints sort by numeric point name. Numeric names zero-pad to four
/// digits, a missing symbol gets the default, and a missing timestamp
/// gets the document's generation time.
pub fn write_gpx(pts: &[Waypoint]) -> String {
    let mut pts = pts.to_vec();
    sort_waypoints(&mut pts);

    let isotime = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut xml = String::new();
    writeln!(&mut xml, "<?xml version=\"1.0\" encoding=\"utf-8\"?>").unwrap();
    writeln!(
        &mut xml,
        "<gpx creator=\"survey_gis\" version=\"1.1\"\n\
         \x20   xsi:schemaLocation=\"http://www.topografix.com/GPX/1/1 \
         http://www.topografix.com/GPX/1/1/gpx.xsd\"\n\
         \x20   xmlns=\"http://www.topografix.com/GPX/1/1\"\n\
         \x20   xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">"
    )
    .unwrap();
    writeln!(&mut xml, "  <metadata>").unwrap();
    writeln!(&mut xml, "    <link href=\"{METADATA_LINK}\">").unwrap();
    writeln!(&mut xml, "      <text>{METADATA_LINK_TEXT}</text>").unwrap();
    writeln!(&mut xml, "    </link>").unwrap();
    writeln!(&mut xml, "    <time>{isotime}</time>").unwrap();
    writeln!(&mut xml, "  </metadata>").unwrap();

    for p in &pts {
        writeln!(
            &mut xml,
            "  <wpt lat=\"{:.8}\" lon=\"{:.8}\">",
            p.lat, p.lon
        )
        .unwrap();
        writeln!(&mut xml, "    <ele>{:.4}</ele>", p.ele).unwrap();
        let time = p.time.as_deref().unwrap_or(&isotime);
        writeln!(&mut xml, "    <time>{}</time>", escape_xml(time)).unwrap();
        if let Some(name) = &p.name {
            let name = if p.numeric_name() >= 0 {
                format!("{:04}", p.numeric_name())
            } else {
                name.clone()
            };
            writeln!(&mut xml, "    <name>{}</name>", escape_xml(&name)).unwrap();
        }
        if let Some(cmt) = &p.cmt {
            writeln!(&mut xml, "    <cmt>{}</cmt>", escape_xml(cmt)).unwrap();
        }
        if let Some(desc) = &p.desc {
            writeln!(&mut xml, "    <desc>{}</desc>", escape_xml(desc)).unwrap();
        }
        let sym = p.sym.as_deref().unwrap_or(WPT_SYMBOL);
        writeln!(&mut xml, "    <sym>{}</sym>", escape_xml(sym)).unwrap();
        if let Some(t) = &p.wpt_type {
            writeln!(&mut xml, "    <type>{}</type>", escape_xml(t)).unwrap();
        }
        writeln!(&mut xml, "  </wpt>").unwrap();
    }

    writeln!(&mut xml, "</gpx>").unwrap();
    xml
}
