//! Line-traverse calculator.
//!
//! Interprets a small command language for walking out record boundary
//! descriptions: one command per line, building polylines vertex by
//! vertex and producing a listing block per command. Commands:
//!
//! ```text
//! BEGIN n e | BEGIN id      start a polyline at coordinates or a point
//! BRANCH                    start a new polyline at the current point
//! RESUME                    switch back to the previous polyline
//! POINT id [n e | LAST] [desc...]   save a named point
//! CLOSE id                  report closure to a saved point
//! UNDO                      remove the last vertex
//! 1..4 brg dist             line by quadrant bearing and distance
//! L|R delta radius [quad radial]    curve, tangent or radial non-tangent
//! DL|DR delta dist          line by deflection from the back tangent
//! ```
//!
//! Bearings are `dd.mmss` in quadrants NE/SE/SW/NW (1-4), deltas and
//! deflections `[-]ddd.mmss`. Processing stops at the first bad command;
//! traverse state is cumulative, so nothing after a bad line is
//! trustworthy.

pub mod angle;

use std::collections::HashMap;

use crate::error::BadCommand;

pub use angle::{bearing_angle, bearing_string, dms_angle, dms_string};

const QUADRANT_NAMES: [&str; 4] = ["NE", "SE", "SW", "NW"];

/// Difference in tangents below this rounds to zero and passes the
/// tangency check.
const TANGENCY_TOLERANCE: f64 = 5e-7;

/// A polyline vertex. `turn` is the signed included angle of the curve
/// leaving this vertex (counterclockwise positive), zero for a straight
/// segment or the final vertex.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub turn: f64,
}

/// A coordinate saved with `POINT`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SavedPoint {
    pub x: f64,
    pub y: f64,
    pub desc: String,
}

/// A vertex with its curve converted to a bulge factor (`tan(turn/4)`),
/// the arc encoding polyline renderers expect.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct BulgeVertex {
    pub x: f64,
    pub y: f64,
    pub bulge: f64,
}

/// Everything a traverse run produces.
#[derive(Debug, Clone, Default)]
pub struct TraverseResult {
    /// One listing block per command, plus warnings and the points table.
    pub listing: Vec<String>,
    pub polylines: Vec<Vec<Vertex>>,
    pub points: HashMap<String, SavedPoint>,
}

impl TraverseResult {
    /// The full listing with blank lines between blocks.
    pub fn listing_text(&self) -> String {
        self.listing.join("\n")
    }
}

/// Converts a completed polyline to bulge form for a drawing backend.
pub fn bulge_vertices(poly: &[Vertex]) -> Vec<BulgeVertex> {
    poly.iter()
        .map(|v| BulgeVertex {
            x: v.x,
            y: v.y,
            bulge: (v.turn / 4.0).tan(),
        })
        .collect()
}

fn bad(line: usize, reason: &str, text: &str) -> BadCommand {
    BadCommand {
        line,
        reason: reason.to_string(),
        text: text.to_string(),
    }
}

/// Warns when consecutive segments meet with a kink.
///
/// Compares the forward tangent of the second-to-last segment with the
/// back tangent of the last segment at their shared vertex.
fn check_tangency(poly: &[Vertex]) -> Option<String> {
    let n = poly.len();
    debug_assert!(n >= 3);
    let p0 = poly[n - 3];
    let p1 = poly[n - 2];
    let p2 = poly[n - 1];

    let t1 = (p1.y - p0.y).atan2(p1.x - p0.x) + p0.turn / 2.0;
    let t2 = (p2.y - p1.y).atan2(p2.x - p1.x) - p1.turn / 2.0;
    let dt = t2 - t1;

    if dt.abs() >= TANGENCY_TOLERANCE {
        Some(format!(
            "### Segment is not tangent.\n### Difference in tangents: {}\n",
            dms_string(dt, 1)
        ))
    } else {
        None
    }
}

/// The back tangent direction at the end of a polyline.
fn back_tangent(poly: &[Vertex]) -> Option<f64> {
    if poly.len() < 2 {
        return None;
    }
    let p0 = poly[poly.len() - 2];
    let p1 = poly[poly.len() - 1];
    Some((p1.y - p0.y).atan2(p1.x - p0.x) - (p1.turn - p0.turn) / 2.0)
}

/// Runs a traverse program and returns the listing, polylines and saved
/// points. Fails with [`BadCommand`] at the first malformed or
/// out-of-sequence line.
pub fn process_line_data(input: &str) -> Result<TraverseResult, BadCommand> {
    let mut listing: Vec<String> = Vec::new();
    let mut polylines: Vec<Vec<Vertex>> = Vec::new();
    let mut points: HashMap<String, SavedPoint> = HashMap::new();

    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let linenum = i + 1;
        let mut params: Vec<&str> = line.split_whitespace().collect();
        let cmd = params.remove(0).to_ascii_uppercase();

        match cmd.as_str() {
            "BEGIN" => {
                let (x, y, header) = match params.as_slice() {
                    [n, e] => {
                        let y: f64 = n
                            .parse()
                            .map_err(|_| bad(linenum, "Bad northing/easting coordinate", line))?;
                        let x: f64 = e
                            .parse()
                            .map_err(|_| bad(linenum, "Bad northing/easting coordinate", line))?;
                        (x, y, format!("[{linenum}] Begin polyline\n"))
                    }
                    [id] => {
                        let id = id.to_ascii_uppercase();
                        let p = points
                            .get(&id)
                            .ok_or_else(|| bad(linenum, "Point not found", line))?;
                        (
                            p.x,
                            p.y,
                            format!("[{linenum}] Begin polyline from point {id} {}\n", p.desc),
                        )
                    }
                    _ => return Err(bad(linenum, "Bad line format", line)),
                };
                polylines.push(vec![Vertex { x, y, turn: 0.0 }]);
                listing.push(format!("{header}  From N: {y:<14.3}     E: {x:.3}\n"));
            }

            "BRANCH" => {
                if !params.is_empty() {
                    return Err(bad(linenum, "Bad line format", line));
                }
                let last = polylines
                    .last()
                    .and_then(|p| p.last())
                    .copied()
                    .ok_or_else(|| bad(linenum, "No polyline to branch", line))?;
                polylines.push(vec![Vertex { turn: 0.0, ..last }]);
                listing.push(format!(
                    "[{linenum}] Branch polyline\n  From N: {:<14.3}     E: {:.3}\n",
                    last.y, last.x
                ));
            }

            "RESUME" => {
                if !params.is_empty() {
                    return Err(bad(linenum, "Bad line format", line));
                }
                if polylines.len() < 2 {
                    return Err(bad(linenum, "No polyline to resume", line));
                }
                // The current polyline rotates to the bottom of the list;
                // the one before it becomes current again.
                let current = polylines.pop().unwrap();
                polylines.insert(0, current);
                let last = polylines.last().unwrap().last().unwrap();
                listing.push(format!(
                    "[{linenum}] Resume polyline\n  From N: {:<14.3}     E: {:.3}\n",
                    last.y, last.x
                ));
            }

            "POINT" => {
                if params.is_empty() {
                    return Err(bad(linenum, "Bad line format", line));
                }
                let id = params.remove(0).to_ascii_uppercase();
                let (x, y, desc) = match params.as_slice() {
                    [first, rest @ ..] if first.eq_ignore_ascii_case("LAST") => {
                        let last = polylines
                            .last()
                            .and_then(|p| p.last())
                            .ok_or_else(|| bad(linenum, "No point to store", line))?;
                        (last.x, last.y, rest.join(" "))
                    }
                    [n, e, rest @ ..] => {
                        let y: f64 = n
                            .parse()
                            .map_err(|_| bad(linenum, "Bad point coordinates", line))?;
                        let x: f64 = e
                            .parse()
                            .map_err(|_| bad(linenum, "Bad point coordinates", line))?;
                        (x, y, rest.join(" "))
                    }
                    _ => return Err(bad(linenum, "Bad line format", line)),
                };
                listing.push(format!(
                    "[{linenum}] Save point {id} {desc}\n  N: {y:<14.3}          E: {x:.3}\n"
                ));
                points.insert(id, SavedPoint { x, y, desc });
            }

            "CLOSE" => {
                let [id] = params.as_slice() else {
                    return Err(bad(linenum, "Bad line format", line));
                };
                let p0 = polylines
                    .last()
                    .and_then(|p| p.last())
                    .copied()
                    .ok_or_else(|| bad(linenum, "No polyline to close to", line))?;
                let id = id.to_ascii_uppercase();
                let p1 = points
                    .get(&id)
                    .ok_or_else(|| bad(linenum, "Point not found", line))?;
                let (dx, dy) = (p1.x - p0.x, p1.y - p0.y);
                let a = dy.atan2(dx);
                let d = dx.hypot(dy);
                listing.push(format!(
                    "[{linenum}] Closure to {id}\n\
                     \x20 From N: {:<14.3}     E: {:.3}\n\
                     \x20 To   N: {:<14.3}     E: {:.3}\n\
                     \x20 Distance: {d:<10.3}       Course: {}\n",
                    p0.y,
                    p0.x,
                    p1.y,
                    p1.x,
                    bearing_string(a, 1)
                ));
            }

            "UNDO" => {
                let poly = polylines
                    .last_mut()
                    .ok_or_else(|| bad(linenum, "No point to undo", line))?;
                poly.pop();
                if poly.is_empty() {
                    polylines.pop();
                    listing.push(format!("[{linenum}] Delete polyline\n"));
                } else {
                    // The outgoing segment is gone, so the vertex is no
                    // longer the start of a curve.
                    poly.last_mut().unwrap().turn = 0.0;
                    listing.push(format!("[{linenum}] Delete segment\n"));
                }
            }

            "1" | "2" | "3" | "4" => {
                let &[bearing, distance] = params.as_slice() else {
                    return Err(bad(linenum, "Bad line format", line));
                };
                let quad: u32 = cmd.parse().unwrap();
                let poly = polylines
                    .last_mut()
                    .ok_or_else(|| bad(linenum, "No initial point", line))?;
                let a = bearing_angle(quad, bearing)
                    .ok_or_else(|| bad(linenum, "Bad bearing/distance", line))?;
                let d: f64 = distance
                    .parse()
                    .map_err(|_| bad(linenum, "Bad bearing/distance", line))?;

                let p0 = *poly.last().unwrap();
                let p1 = Vertex {
                    x: p0.x + d * a.cos(),
                    y: p0.y + d * a.sin(),
                    turn: 0.0,
                };
                poly.push(p1);

                listing.push(format!(
                    "[{linenum}] Line to {}\n\
                     \x20 To N: {:<14.3}       E: {:.3}\n\
                     \x20 Distance: {d:<10.3}       Course: {}\n",
                    QUADRANT_NAMES[(quad - 1) as usize],
                    p1.y,
                    p1.x,
                    bearing_string(a, 1)
                ));

                if poly.len() > 2 && poly[poly.len() - 3].turn != 0.0 {
                    // Previous segment was a curve.
                    if let Some(warning) = check_tangency(poly) {
                        listing.push(warning);
                    }
                }
            }

            "L" | "R" => {
                if params.len() < 2 {
                    return Err(bad(linenum, "Bad line format", line));
                }
                let a = dms_angle(params[0])
                    .map(|a| if cmd == "L" { -a } else { a })
                    .ok_or_else(|| bad(linenum, "Bad delta/radius", line))?;
                let r: f64 = params[1]
                    .parse()
                    .map_err(|_| bad(linenum, "Bad delta/radius", line))?;
                let poly = polylines
                    .last_mut()
                    .ok_or_else(|| bad(linenum, "No initial point", line))?;

                let (t, header) = match params.len() {
                    2 => {
                        // Tangent curve: the back tangent comes from the
                        // previous segment.
                        let t = back_tangent(poly)
                            .ok_or_else(|| bad(linenum, "No back tangent", line))?;
                        let dir = if a < 0.0 { "Right" } else { "Left" };
                        (t, format!("[{linenum}] Tangent curve to {dir}\n"))
                    }
                    4 => {
                        // Non-tangent curve: the radial bearing from the
                        // radius point fixes the back tangent.
                        let quad: u32 = params[2]
                            .parse()
                            .map_err(|_| bad(linenum, "Bad quadrant/bearing", line))?;
                        let radial = bearing_angle(quad, params[3])
                            .ok_or_else(|| bad(linenum, "Bad quadrant/bearing", line))?;
                        let t = radial - (std::f64::consts::FRAC_PI_2).copysign(a);
                        let dir = if a < 0.0 { "Right" } else { "Left" };
                        (t, format!("[{linenum}] Non-Tangent curve to {dir}\n"))
                    }
                    _ => return Err(bad(linenum, "Bad line format", line)),
                };

                let c = (2.0 * r * (a / 2.0).sin()).abs();
                let p1 = *poly.last().unwrap();
                let p2 = Vertex {
                    x: p1.x + c * (t + a / 2.0).cos(),
                    y: p1.y + c * (t + a / 2.0).sin(),
                    turn: 0.0,
                };
                poly.push(p2);
                let n = poly.len();
                poly[n - 2].turn = a;

                let delta = -a.abs();
                let arc_len = -r * delta;
                let tan_len = -r * (delta / 2.0).tan();
                listing.push(format!(
                    "{header}\
                     \x20 To N: {:<14.3}       E: {:.3}\n\
                     \x20 Tangent: {tan_len:<10.3}        Chord:  {c:<10.3}     Course: {}\n\
                     \x20 Arc Len: {arc_len:<10.3}        Radius: {r:<10.3}     Delta:  {}\n",
                    p2.y,
                    p2.x,
                    bearing_string(t + a / 2.0, 1),
                    dms_string(delta, 1)
                ));

                if poly.len() > 2 {
                    if let Some(warning) = check_tangency(poly) {
                        listing.push(warning);
                    }
                }
            }

            "DL" | "DR" => {
                let &[delta, distance] = params.as_slice() else {
                    return Err(bad(linenum, "Bad line format", line));
                };
                let a = dms_angle(delta)
                    .map(|a| if cmd == "DL" { -a } else { a })
                    .ok_or_else(|| bad(linenum, "Bad deflection/distance", line))?;
                let d: f64 = distance
                    .parse()
                    .map_err(|_| bad(linenum, "Bad deflection/distance", line))?;
                let poly = polylines
                    .last_mut()
                    .ok_or_else(|| bad(linenum, "No initial point", line))?;
                let t =
                    back_tangent(poly).ok_or_else(|| bad(linenum, "No back tangent line", line))?;

                let p1 = *poly.last().unwrap();
                let p2 = Vertex {
                    x: p1.x + d * (t + a).cos(),
                    y: p1.y + d * (t + a).sin(),
                    turn: 0.0,
                };
                poly.push(p2);

                let dir = if cmd == "DL" { "Left" } else { "Right" };
                listing.push(format!(
                    "[{linenum}] Line by deflection {dir}\n\
                     \x20 To N: {:<14.3}       E: {:.3}\n\
                     \x20 Distance: {d:<10.3}       Course: {}\n",
                    p2.y,
                    p2.x,
                    bearing_string(t + a, 1)
                ));

                if poly.len() > 2 && poly[poly.len() - 3].turn != 0.0 {
                    if let Some(warning) = check_tangency(poly) {
                        listing.push(warning);
                    }
                }
            }

            _ => return Err(bad(linenum, "Bad line format", line)),
        }
    }

    if !points.is_empty() {
        listing.push(points_listing(&points));
    }

    Ok(TraverseResult {
        listing,
        polylines,
        points,
    })
}

/// PNEZD-style table of the saved points, numeric ids first.
fn points_listing(points: &HashMap<String, SavedPoint>) -> String {
    let mut ids: Vec<&String> = points.keys().collect();
    ids.sort_by_key(|id| point_sort_key(id));
    let mut block = String::from("Points listing\n\n");
    for id in ids {
        let p = &points[id];
        block.push_str(&format!("{id},{:.4},{:.4},0.0000,{}\n", p.y, p.x, p.desc));
    }
    block
}

fn point_sort_key(id: &str) -> String {
    match id.parse::<u64>() {
        // '#' sorts before alphanumerics, so numeric ids come first.
        Ok(n) if id.chars().all(|c| c.is_ascii_digit()) => format!("#{n:08}"),
        _ => id.to_string(),
    }
}
