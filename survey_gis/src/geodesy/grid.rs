//! HTDP-derived displacement grid.
//!
//! The grid moves NAD83 coordinates between epochs. It is built once
//! offline from an NGS HTDP displacement listing, saved as a dense binary
//! array of integer-millimeter east/north offsets with a small companion
//! dims text file, and loaded read-only at runtime. The listing format -
//!
//! ```text
//!  HTDP (VERSION v3.2.7    ) OUTPUT
//!
//!  DISPLACEMENTS IN METERS RELATIVE TO NAD_83(2011/CORS96/2007)
//!  FROM 07-02-2019 TO 01-01-2010 (month-day-year)
//!  FROM 2019.500 TO 2010.000 (decimal years)
//!
//! NAME OF SITE             LATITUDE          LONGITUDE            NORTH    EAST    UP
//! 2019.50      0   0       38 30  0.00000 N  120  0  0.00000 W   -0.087   0.067   0.013
//! 2019.50      0   1       38 30  0.00000 N  120  0 15.00000 W   -0.087   0.067   0.013
//! ```
//!
//! Row/column indices are sliced at fixed character offsets because the
//! fixed-width fields can abut; the remaining fields are whitespace
//! delimited.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TransformError;

/// Magic prefix of the binary grid file.
const GRID_MAGIC: &[u8; 4] = b"DGRD";

static REF_FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DISPLACEMENTS.*RELATIVE TO\s+(.*)").unwrap());
static EPOCHS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"FROM (\d{4}\.\d+) TO (\d{4}\.\d+)").unwrap());

/// Grid metadata stored in the companion dims file.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GridDims {
    /// Reference frame named in the HTDP header.
    pub ref_frame: String,
    /// Longitude of the grid origin in decimal degrees, negative west.
    pub base_lon: f64,
    /// Latitude of the grid origin in decimal degrees.
    pub base_lat: f64,
    /// Longitude cell step in arc-seconds.
    pub step_lon: i64,
    /// Latitude cell step in arc-seconds.
    pub step_lat: i64,
    /// Epoch the displacements move coordinates from.
    pub epoch_src: f64,
    /// Epoch the displacements move coordinates to.
    pub epoch_dst: f64,
}

/// Dense east/north displacement grid in integer millimeters.
///
/// Indexed by (longitude cell, latitude cell); longitude cells increase
/// westward from the base corner, latitude cells northward. Loaded once
/// and never mutated, so one instance may be shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementGrid {
    dims: GridDims,
    lon_cells: usize,
    lat_cells: usize,
    /// (east, north) pairs, latitude-minor.
    cells: Vec<[i32; 2]>,
}

impl DisplacementGrid {
    /// Grid metadata.
    pub fn dims(&self) -> &GridDims {
        &self.dims
    }

    /// Number of cells along the longitude and latitude axes.
    pub fn shape(&self) -> (usize, usize) {
        (self.lon_cells, self.lat_cells)
    }

    fn cell(&self, i: usize, j: usize) -> [i32; 2] {
        self.cells[i * self.lat_cells + j]
    }

    /// Builds a grid from an HTDP displacement listing.
    ///
    /// `site_name` is the site-name prefix HTDP wrote on every data row
    /// (conventionally the source epoch, e.g. `"2019.50"`). This is the
    /// one-time offline step; at runtime grids are [`load`](Self::load)ed
    /// from the binary format.
    pub fn from_htdp_listing(path: &Path, site_name: &str) -> Result<Self, TransformError> {
        let mut text = String::new();
        File::open(path)?.read_to_string(&mut text)?;
        Self::from_htdp_text(&text, site_name)
    }

    /// Parses HTDP listing text. See [`from_htdp_listing`](Self::from_htdp_listing).
    pub fn from_htdp_text(text: &str, site_name: &str) -> Result<Self, TransformError> {
        let bad = |msg: &str| TransformError::GridFormat(msg.to_string());

        let mut ref_frame: Option<String> = None;
        let mut epochs: Option<(f64, f64)> = None;
        let mut base_lon: Option<f64> = None;
        let mut base_lat: Option<f64> = None;
        let mut step_lon: Option<i64> = None;
        let mut step_lat: Option<i64> = None;

        // First pass: reference frame, epochs, base lon/lat and step size
        // from the (0,0), (0,1) and (1,0) records.
        for line in text.lines() {
            let trimmed = line.trim();
            if line.starts_with(site_name) {
                let (i, j, fields) = slice_record(line)?;
                if i == 0 && j == 0 {
                    base_lat = Some(dms_field(&fields, 0)?);
                    base_lon = Some(-dms_field(&fields, 4)?);
                } else if i == 0 && j == 1 {
                    let lon = dms_field(&fields, 4)?;
                    let base = base_lon.ok_or_else(|| bad("record (0,1) before (0,0)"))?;
                    step_lon = Some(((lon + base) * 3600.0).round() as i64);
                } else if i == 1 && j == 0 {
                    let lat = dms_field(&fields, 0)?;
                    let base = base_lat.ok_or_else(|| bad("record (1,0) before (0,0)"))?;
                    step_lat = Some(((lat - base) * 3600.0).round() as i64);
                    break;
                }
            } else if let Some(m) = REF_FRAME_RE.captures(trimmed) {
                ref_frame = Some(m[1].trim().to_string());
            } else if let Some(m) = EPOCHS_RE.captures(trimmed) {
                let src: f64 = m[1].parse().map_err(|_| bad("bad source epoch"))?;
                let dst: f64 = m[2].parse().map_err(|_| bad("bad destination epoch"))?;
                epochs = Some((src, dst));
            }
        }

        let (epoch_src, epoch_dst) = epochs.ok_or_else(|| bad("missing epoch header"))?;
        let dims = GridDims {
            ref_frame: ref_frame.ok_or_else(|| bad("missing reference frame header"))?,
            base_lon: base_lon.ok_or_else(|| bad("missing base record (0,0)"))?,
            base_lat: base_lat.ok_or_else(|| bad("missing base record (0,0)"))?,
            step_lon: step_lon.ok_or_else(|| bad("missing record (0,1)"))?,
            step_lat: step_lat.ok_or_else(|| bad("missing record (1,0)"))?,
            epoch_src,
            epoch_dst,
        };

        // Second pass: collect displacement rows. The listing is
        // latitude-major (one row per latitude, columns marching west).
        let mut rows: Vec<Vec<[i32; 2]>> = Vec::new();
        let mut row: Vec<[i32; 2]> = Vec::new();
        for line in text.lines() {
            if !line.starts_with(site_name) {
                continue;
            }
            let (_, j, fields) = slice_record(line)?;
            if j == 0 && !row.is_empty() {
                rows.push(std::mem::take(&mut row));
            }
            if fields.len() < 3 {
                return Err(bad("short displacement record"));
            }
            // North and east are the third- and second-to-last fields.
            let n = mm_field(&fields, fields.len() - 3)?;
            let e = mm_field(&fields, fields.len() - 2)?;
            row.push([e, n]);
        }
        if !row.is_empty() {
            rows.push(row);
        }

        let lat_cells = rows.len();
        let lon_cells = rows.first().map(Vec::len).unwrap_or(0);
        if lat_cells < 2 || lon_cells < 2 {
            return Err(bad("grid must cover at least two cells per axis"));
        }
        if rows.iter().any(|r| r.len() != lon_cells) {
            return Err(bad("ragged displacement rows"));
        }

        // Transpose to (longitude cell, latitude cell) order.
        let mut cells = vec![[0_i32; 2]; lon_cells * lat_cells];
        for (j, r) in rows.iter().enumerate() {
            for (i, v) in r.iter().enumerate() {
                cells[i * lat_cells + j] = *v;
            }
        }

        log::info!(
            "built {}x{} displacement grid, {} -> {}",
            lon_cells,
            lat_cells,
            dims.epoch_src,
            dims.epoch_dst
        );

        Ok(Self {
            dims,
            lon_cells,
            lat_cells,
            cells,
        })
    }

    /// Writes the binary grid file and its companion dims text file.
    pub fn save(&self, grid_path: &Path, dims_path: &Path) -> Result<(), TransformError> {
        let mut w = BufWriter::new(File::create(grid_path)?);
        w.write_all(GRID_MAGIC)?;
        w.write_u32::<LittleEndian>(self.lon_cells as u32)?;
        w.write_u32::<LittleEndian>(self.lat_cells as u32)?;
        for cell in &self.cells {
            w.write_i32::<LittleEndian>(cell[0])?;
            w.write_i32::<LittleEndian>(cell[1])?;
        }
        w.flush()?;

        let d = &self.dims;
        let mut f = File::create(dims_path)?;
        writeln!(f, "{}", d.ref_frame)?;
        writeln!(f, "{:.6} {:.6}", d.base_lon, d.base_lat)?;
        writeln!(f, "{} {}", d.step_lon, d.step_lat)?;
        writeln!(f, "{:.2} {:.2}", d.epoch_src, d.epoch_dst)?;
        Ok(())
    }

    /// Loads a grid from the binary file and its companion dims file.
    pub fn load(grid_path: &Path, dims_path: &Path) -> Result<Self, TransformError> {
        let bad = |msg: &str| TransformError::GridFormat(msg.to_string());

        let mut dims_text = String::new();
        File::open(dims_path)?.read_to_string(&mut dims_text)?;
        let mut lines = dims_text.lines();
        let ref_frame = lines.next().ok_or_else(|| bad("empty dims file"))?.to_string();
        let base = split_pair(lines.next(), "base lon/lat")?;
        let step = split_pair(lines.next(), "step size")?;
        let epochs = split_pair(lines.next(), "epochs")?;
        let dims = GridDims {
            ref_frame,
            base_lon: base.0,
            base_lat: base.1,
            step_lon: step.0 as i64,
            step_lat: step.1 as i64,
            epoch_src: epochs.0,
            epoch_dst: epochs.1,
        };
        if dims.step_lon == 0 || dims.step_lat == 0 {
            return Err(bad("zero step size"));
        }

        let mut r = BufReader::new(File::open(grid_path)?);
        let mut magic = [0_u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != GRID_MAGIC {
            return Err(bad("not a displacement grid file"));
        }
        let lon_cells = r.read_u32::<LittleEndian>()? as usize;
        let lat_cells = r.read_u32::<LittleEndian>()? as usize;
        let mut cells = Vec::with_capacity(lon_cells * lat_cells);
        for _ in 0..lon_cells * lat_cells {
            let e = r.read_i32::<LittleEndian>()?;
            let n = r.read_i32::<LittleEndian>()?;
            cells.push([e, n]);
        }
        log::debug!(
            "loaded {}x{} displacement grid from {}",
            lon_cells,
            lat_cells,
            grid_path.display()
        );

        Ok(Self {
            dims,
            lon_cells,
            lat_cells,
            cells,
        })
    }

    /// Bilinearly interpolated east/north/up displacement in meters at
    /// `lon`/`lat`, scaled to `epoch`.
    ///
    /// The grid's native displacement moves coordinates from `epoch_src`
    /// to `epoch_dst`; for other epochs the value is scaled by
    /// `(epoch - epoch_dst) / (epoch_src - epoch_dst)`, a first-order
    /// approximation of the secular motion. Fails with
    /// [`TransformError::OutOfGridBounds`] when any of the four
    /// surrounding corners is outside the grid.
    pub fn lookup(&self, lon: f64, lat: f64, epoch: f64) -> Result<(f64, f64, f64), TransformError> {
        let d = &self.dims;

        // Fractional cell indices; longitude cells count westward.
        let fi = (lon - d.base_lon) * 3600.0 / d.step_lon as f64 * -1.0;
        let fj = (lat - d.base_lat) * 3600.0 / d.step_lat as f64;
        let frac_lon = fi - fi.floor();
        let frac_lat = fj - fj.floor();
        let i = fi.floor() as i64;
        let j = fj.floor() as i64;

        // All four corners of the containing cell must be in range.
        if i < 0 || i + 1 >= self.lon_cells as i64 || j < 0 || j + 1 >= self.lat_cells as i64 {
            return Err(TransformError::OutOfGridBounds { lon, lat });
        }
        let (i, j) = (i as usize, j as usize);

        let lr = self.cell(i, j);
        let ll = self.cell(i + 1, j);
        let ur = self.cell(i, j + 1);
        let ul = self.cell(i + 1, j + 1);

        let interp = |k: usize| -> f64 {
            let lower = (1.0 - frac_lon) * lr[k] as f64 + frac_lon * ll[k] as f64;
            let upper = (1.0 - frac_lon) * ur[k] as f64 + frac_lon * ul[k] as f64;
            (1.0 - frac_lat) * lower + frac_lat * upper
        };

        let scale = (epoch - d.epoch_dst) / (d.epoch_src - d.epoch_dst);
        let e = interp(0) / 1000.0 * scale;
        let n = interp(1) / 1000.0 * scale;

        Ok((e, n, 0.0))
    }
}

/// Slices an HTDP data record into row index, column index and the
/// remaining whitespace-split fields.
fn slice_record(line: &str) -> Result<(usize, usize, Vec<String>), TransformError> {
    let bad = || TransformError::GridFormat(format!("bad HTDP record: {line}"));
    if line.len() < 18 {
        return Err(bad());
    }
    let i: usize = line[10..14].trim().parse().map_err(|_| bad())?;
    let j: usize = line[14..18].trim().parse().map_err(|_| bad())?;
    let fields = line[18..].split_whitespace().map(str::to_string).collect();
    Ok((i, j, fields))
}

/// Degrees/minutes/seconds triple starting at `start`.
fn dms_field(fields: &[String], start: usize) -> Result<f64, TransformError> {
    let bad = || TransformError::GridFormat("bad DMS field in HTDP record".to_string());
    if fields.len() < start + 3 {
        return Err(bad());
    }
    let d: f64 = fields[start].parse().map_err(|_| bad())?;
    let m: f64 = fields[start + 1].parse().map_err(|_| bad())?;
    let s: f64 = fields[start + 2].parse().map_err(|_| bad())?;
    Ok(d + m / 60.0 + s / 3600.0)
}

/// Displacement field in meters converted to integer millimeters.
fn mm_field(fields: &[String], idx: usize) -> Result<i32, TransformError> {
    let v: f64 = fields[idx]
        .parse()
        .map_err(|_| TransformError::GridFormat("bad displacement field".to_string()))?;
    Ok((v * 1000.0) as i32)
}

fn split_pair(line: Option<&str>, what: &str) -> Result<(f64, f64), TransformError> {
    let bad = || TransformError::GridFormat(format!("bad dims file: missing {what}"));
    let line = line.ok_or_else(bad)?;
    let mut it = line.split_whitespace();
    let a: f64 = it.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let b: f64 = it.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    // A 3x3 listing with distinct displacements per site so interpolation
    // and transposition are visible.
    const LISTING: &str = "\
 HTDP (VERSION v3.2.7    ) OUTPUT

 DISPLACEMENTS IN METERS RELATIVE TO NAD_83(2011/CORS96/2007)
 FROM 07-02-2019 TO 01-01-2010 (month-day-year)
 FROM 2019.500 TO 2010.000 (decimal years)

NAME OF SITE             LATITUDE          LONGITUDE            NORTH    EAST    UP
2019.50      0   0       38 30  0.00000 N  120  0  0.00000 W   -0.100   0.060   0.013
2019.50      0   1       38 30  0.00000 N  120  0 15.00000 W   -0.102   0.062   0.013
2019.50      0   2       38 30  0.00000 N  120  0 30.00000 W   -0.104   0.064   0.013
2019.50      1   0       38 30 15.00000 N  120  0  0.00000 W   -0.110   0.070   0.013
2019.50      1   1       38 30 15.00000 N  120  0 15.00000 W   -0.112   0.072   0.013
2019.50      1   2       38 30 15.00000 N  120  0 30.00000 W   -0.114   0.074   0.013
2019.50      2   0       38 30 30.00000 N  120  0  0.00000 W   -0.120   0.080   0.013
2019.50      2   1       38 30 30.00000 N  120  0 15.00000 W   -0.122   0.082   0.013
2019.50      2   2       38 30 30.00000 N  120  0 30.00000 W   -0.124   0.084   0.013
";

    fn grid() -> DisplacementGrid {
        DisplacementGrid::from_htdp_text(LISTING, "2019.50").unwrap()
    }

    #[test]
    fn builds_dims_from_listing() {
        let g = grid();
        let d = g.dims();
        assert_eq!(d.ref_frame, "NAD_83(2011/CORS96/2007)");
        assert!((d.base_lon - -120.0).abs() < 1e-9);
        assert!((d.base_lat - 38.5).abs() < 1e-9);
        assert_eq!(d.step_lon, 15);
        assert_eq!(d.step_lat, 15);
        assert!((d.epoch_src - 2019.5).abs() < 1e-9);
        assert!((d.epoch_dst - 2010.0).abs() < 1e-9);
        assert_eq!(g.shape(), (3, 3));
    }

    #[test]
    fn lookup_on_sample_point_is_exact() {
        let g = grid();
        // Grid corner (1,1): one step west and one step north of the base.
        let lon = -120.0 - 15.0 / 3600.0;
        let lat = 38.5 + 15.0 / 3600.0;
        let (e, n, u) = g.lookup(lon, lat, 2019.5).unwrap();
        assert!((e - 0.072).abs() < 1e-9);
        assert!((n - -0.112).abs() < 1e-9);
        assert_eq!(u, 0.0);
    }

    #[test]
    fn lookup_interpolates_between_samples() {
        let g = grid();
        // Center of the first cell.
        let lon = -120.0 - 7.5 / 3600.0;
        let lat = 38.5 + 7.5 / 3600.0;
        let (e, n, _) = g.lookup(lon, lat, 2019.5).unwrap();
        // Mean of the four surrounding corners.
        assert!((e - (0.060 + 0.062 + 0.070 + 0.072) / 4.0).abs() < 1e-9);
        assert!((n - (-0.100 - 0.102 - 0.110 - 0.112) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn lookup_scales_to_epoch() {
        let g = grid();
        let lon = -120.0 - 15.0 / 3600.0;
        let lat = 38.5 + 15.0 / 3600.0;
        let (e_full, _, _) = g.lookup(lon, lat, 2019.5).unwrap();
        let (e_half, _, _) = g.lookup(lon, lat, 2014.75).unwrap();
        assert!((e_half - e_full / 2.0).abs() < 1e-9);
        let (e_dst, n_dst, _) = g.lookup(lon, lat, 2010.0).unwrap();
        assert_eq!(e_dst, 0.0);
        assert_eq!(n_dst, 0.0);
    }

    #[test]
    fn lookup_outside_grid_fails() {
        let g = grid();
        // East of the base corner.
        assert!(matches!(
            g.lookup(-119.9, 38.5, 2019.5),
            Err(TransformError::OutOfGridBounds { .. })
        ));
        // North of coverage: the (j+1) corner would leave the grid.
        assert!(matches!(
            g.lookup(-120.003, 38.509, 2019.5),
            Err(TransformError::OutOfGridBounds { .. })
        ));
    }

    #[test]
    fn zero_step_dims_file_is_rejected() {
        let g = grid();
        let dir = tempfile::tempdir().unwrap();
        let grid_path = dir.path().join("disp.grd");
        let dims_path = dir.path().join("disp.dim");
        g.save(&grid_path, &dims_path).unwrap();

        let dims_text = std::fs::read_to_string(&dims_path).unwrap();
        std::fs::write(&dims_path, dims_text.replace("15 15", "0 15")).unwrap();
        assert!(matches!(
            DisplacementGrid::load(&grid_path, &dims_path),
            Err(TransformError::GridFormat(_))
        ));
    }

    #[test]
    fn save_load_round_trip() {
        let g = grid();
        let dir = tempfile::tempdir().unwrap();
        let grid_path = dir.path().join("disp.grd");
        let dims_path = dir.path().join("disp.dim");
        g.save(&grid_path, &dims_path).unwrap();
        let loaded = DisplacementGrid::load(&grid_path, &dims_path).unwrap();
        assert_eq!(g, loaded);
    }
}
