//! Time-dependent Helmert similarity transform between ITRF2008/WGS84 and
//! NAD83, with the HTDP displacement-grid epoch correction.
//!
//! Transforming ITRF2008 coordinates at a collection epoch to NAD83 at the
//! control epoch proceeds in two steps: a 7-parameter coordinate-frame
//! rotation propagated to the collection epoch brings the point to NAD83
//! at that same epoch, then a grid-interpolated crustal-motion
//! displacement carries it to the grid's destination epoch (2010.00 for
//! current NGS control). The inverse runs the steps in the opposite order.

use nalgebra::{Matrix3, Vector3};

use crate::error::TransformError;

use super::ellipsoid::{
    cartesian_to_geodetic, geodetic_to_cartesian, CartesianPoint, Ellipsoid, GeodeticPoint,
    RefFrame,
};
use super::grid::DisplacementGrid;

/// Seven-parameter Helmert transform with per-year rates.
///
/// Translations in meters, rotations in milli-arc-seconds, scale in parts
/// per billion; the rate terms use the same units per year, referenced to
/// epoch `t0`. The rotation convention is coordinate frame rotation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HelmertParams {
    pub tx: f64,
    pub ty: f64,
    pub tz: f64,
    pub rx: f64,
    pub ry: f64,
    pub rz: f64,
    pub s: f64,
    pub dtx: f64,
    pub dty: f64,
    pub dtz: f64,
    pub drx: f64,
    pub dry: f64,
    pub drz: f64,
    pub ds: f64,
    pub t0: f64,
}

impl HelmertParams {
    /// ITRF2008 to NAD83(2011) at reference epoch 2010.00.
    ///
    /// Chained from the published ITRF97-to-ITRF2008 (EPSG:6299, converted
    /// from position vector to frame rotation and inverted) and
    /// ITRF97-to-NAD83(CORS96) (EPSG:6865) transforms, both propagated to
    /// t0 = 2010.00 before combining.
    pub fn itrf2008_nad83_2010() -> Self {
        Self {
            tx: 1.00380,
            ty: -1.91110,
            tz: -0.54350,
            rx: 26.78600,
            ry: -0.41500,
            rz: 10.93600,
            s: 0.42000,
            dtx: 0.00080,
            dty: -0.00060,
            dtz: -0.00130,
            drx: 0.06700,
            dry: -0.75700,
            drz: -0.05100,
            ds: -0.10000,
            t0: 2010.00,
        }
    }

    /// Translation vector, rotation matrix and scale multiplier propagated
    /// to `epoch`.
    fn at_epoch(&self, epoch: f64) -> (Vector3<f64>, Matrix3<f64>, f64) {
        let dt = epoch - self.t0;
        let t = Vector3::new(
            self.tx + self.dtx * dt,
            self.ty + self.dty * dt,
            self.tz + self.dtz * dt,
        );

        // Milli-arc-seconds to radians.
        let rx = (self.rx + self.drx * dt) / 3.6e6;
        let ry = (self.ry + self.dry * dt) / 3.6e6;
        let rz = (self.rz + self.drz * dt) / 3.6e6;
        let (rx, ry, rz) = (rx.to_radians(), ry.to_radians(), rz.to_radians());

        // First-order small-angle rotation matrix. Valid only because the
        // rotation angles are sub-arcsecond.
        #[rustfmt::skip]
        let r = Matrix3::new(
            1.0,  rz, -ry,
            -rz, 1.0,  rx,
             ry, -rx, 1.0,
        );

        // Parts per billion to a unit-less multiplier.
        let m = 1.0 + (self.s + self.ds * dt) * 1.0e-9;

        (t, r, m)
    }
}

/// Datum shift between ITRF2008/WGS84 and NAD83.
///
/// Holds the Helmert parameter set and, normally, the displacement grid
/// that carries NAD83 coordinates to the control epoch. Constructing a
/// shift [`without_grid`](Self::without_grid) is an explicit legacy opt-in
/// that applies a zero displacement; a missing grid is never substituted
/// silently.
#[derive(Debug, Clone)]
pub struct DatumShift {
    params: HelmertParams,
    grid: Option<DisplacementGrid>,
}

impl DatumShift {
    /// Creates a datum shift using `grid` for the epoch correction.
    pub fn new(params: HelmertParams, grid: DisplacementGrid) -> Self {
        Self {
            params,
            grid: Some(grid),
        }
    }

    /// Creates a datum shift that applies no crustal-motion displacement.
    ///
    /// The Helmert step still runs; the result stays at the point's own
    /// epoch rather than the grid's destination epoch.
    pub fn without_grid(params: HelmertParams) -> Self {
        Self { params, grid: None }
    }

    /// The loaded displacement grid, if any.
    pub fn grid(&self) -> Option<&DisplacementGrid> {
        self.grid.as_ref()
    }

    fn displacement(&self, p: &GeodeticPoint, epoch: f64) -> Result<Vector3<f64>, TransformError> {
        match &self.grid {
            Some(grid) => {
                let (e, n, u) = grid.lookup(p.lon, p.lat, epoch)?;
                Ok(Vector3::new(e, n, u))
            }
            None => Ok(Vector3::zeros()),
        }
    }

    /// Transforms an ITRF2008 point observed at `epoch` to NAD83 at the
    /// grid's destination epoch.
    pub fn itrf_to_nad83(
        &self,
        p: &GeodeticPoint,
        epoch: f64,
    ) -> Result<GeodeticPoint, TransformError> {
        check_frame(p, RefFrame::Itrf2008)?;
        let (t, r, m) = self.params.at_epoch(epoch);

        // ITRF2008 -> NAD83 at `epoch` in ECEF, then the grid displacement
        // to the control epoch.
        let vs = as_vector(geodetic_to_cartesian(p, &Ellipsoid::wgs84()));
        let vt = r * vs * m + t;
        let q = cartesian_to_geodetic(&as_point(vt), &Ellipsoid::grs80(), RefFrame::Nad83)?;
        let d = self.displacement(&q, epoch)?;
        add_enu_displacement(&q, d)
    }

    /// Transforms a NAD83 point at the grid's destination epoch back to
    /// ITRF2008 at `epoch`.
    pub fn nad83_to_itrf(
        &self,
        p: &GeodeticPoint,
        epoch: f64,
    ) -> Result<GeodeticPoint, TransformError> {
        check_frame(p, RefFrame::Nad83)?;
        let (t, r, m) = self.params.at_epoch(epoch);

        // Undo the grid displacement first, then invert the similarity
        // transform (transpose rotation, reciprocal scale).
        let d = self.displacement(p, epoch)?;
        let q = subtract_enu_displacement(p, d)?;
        let vs = as_vector(geodetic_to_cartesian(&q, &Ellipsoid::grs80()));
        let vt = r.transpose() * (vs - t) / m;
        cartesian_to_geodetic(&as_point(vt), &Ellipsoid::wgs84(), RefFrame::Itrf2008)
    }
}

/// Applies an east/north/up offset in meters at the point's own location.
///
/// The offset rotates into ECEF through the transpose of the standard
/// ECEF-to-ENU matrix built from the point's longitude and latitude
/// (Misra & Enge).
pub fn add_enu_displacement(
    p: &GeodeticPoint,
    enu: Vector3<f64>,
) -> Result<GeodeticPoint, TransformError> {
    let ell = Ellipsoid::for_frame(p.frame);
    let v0 = as_vector(geodetic_to_cartesian(p, &ell));

    let (sl, cl) = p.lon.to_radians().sin_cos();
    let (sp, cp) = p.lat.to_radians().sin_cos();
    #[rustfmt::skip]
    let r = Matrix3::new(
        -sl,      cl,       0.0,
        -sp * cl, -sp * sl, cp,
        cp * cl,  cp * sl,  sp,
    );

    let v1 = r.transpose() * enu + v0;
    cartesian_to_geodetic(&as_point(v1), &ell, p.frame)
}

/// Removes an east/north/up offset in meters at the point's own location.
pub fn subtract_enu_displacement(
    p: &GeodeticPoint,
    enu: Vector3<f64>,
) -> Result<GeodeticPoint, TransformError> {
    add_enu_displacement(p, -enu)
}

fn check_frame(p: &GeodeticPoint, expected: RefFrame) -> Result<(), TransformError> {
    if p.frame != expected {
        return Err(TransformError::FrameMismatch {
            expected: expected.to_string(),
            got: p.frame.to_string(),
        });
    }
    Ok(())
}

fn as_vector(v: CartesianPoint) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

fn as_point(v: Vector3<f64>) -> CartesianPoint {
    CartesianPoint::new(v[0], v[1], v[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> DatumShift {
        DatumShift::without_grid(HelmertParams::itrf2008_nad83_2010())
    }

    #[test]
    fn helmert_round_trip_without_grid() {
        let shift = shift();
        let p = GeodeticPoint::new(-124.0566589683, 40.2698929701, 12.3, RefFrame::Itrf2008);
        let q = shift.itrf_to_nad83(&p, 2019.5).unwrap();
        assert_eq!(q.frame, RefFrame::Nad83);
        // The shift between the frames is around a meter on the ground.
        assert!((q.lon - p.lon).abs() > 1e-7 && (q.lon - p.lon).abs() < 1e-4);

        let back = shift.nad83_to_itrf(&q, 2019.5).unwrap();
        assert_eq!(back.frame, RefFrame::Itrf2008);
        assert!((back.lon - p.lon).abs() < 1e-9);
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.height - p.height).abs() < 1e-4);
    }

    #[test]
    fn frame_mismatch_is_rejected() {
        let shift = shift();
        let p = GeodeticPoint::new(-124.0, 40.0, 0.0, RefFrame::Nad83);
        assert!(matches!(
            shift.itrf_to_nad83(&p, 2019.5),
            Err(TransformError::FrameMismatch { .. })
        ));
        let q = GeodeticPoint::new(-124.0, 40.0, 0.0, RefFrame::Itrf2008);
        assert!(matches!(
            shift.nad83_to_itrf(&q, 2019.5),
            Err(TransformError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn enu_displacement_round_trip() {
        let p = GeodeticPoint::new(-124.0, 40.0, 25.0, RefFrame::Nad83);
        let d = Vector3::new(0.067, -0.087, 0.013);
        let q = add_enu_displacement(&p, d).unwrap();
        let back = subtract_enu_displacement(&q, d).unwrap();
        assert!((back.lon - p.lon).abs() < 1e-10);
        assert!((back.lat - p.lat).abs() < 1e-10);
        assert!((back.height - p.height).abs() < 1e-6);
    }

    #[test]
    fn enu_east_moves_east() {
        let p = GeodeticPoint::new(-124.0, 40.0, 0.0, RefFrame::Nad83);
        let q = add_enu_displacement(&p, Vector3::new(10.0, 0.0, 0.0)).unwrap();
        assert!(q.lon > p.lon);
        assert!((q.lat - p.lat).abs() < 1e-8);
        let r = add_enu_displacement(&p, Vector3::new(0.0, 10.0, 0.0)).unwrap();
        assert!(r.lat > p.lat);
    }
}
