//! Conversion between geodetic coordinates and the regional grid used by the emissions dataset.
//!
//! The grid is the 148 x 112 CAMx domain covering the contiguous United States: a Lambert conformal
//! conic projection on a 6370 km sphere with 36 km cells. Grid coordinates are one-based, so the
//! centre of the lower-left cell is `(1, 1)`.
use crate::error::ProjectionError;
use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Number of grid cells in the x (west-east) direction
pub const GRID_COLUMNS: usize = 148;
/// Number of grid cells in the y (south-north) direction
pub const GRID_ROWS: usize = 112;

/// Cell size in metres
const CELL_SIZE: f64 = 36_000.0;
const SPHERE_RADIUS: f64 = 6_370_000.0;
const FALSE_EASTING: f64 = 2_736_000.0;
const FALSE_NORTHING: f64 = 2_088_000.0;
const CENTRAL_MERIDIAN: f64 = -97.0;
const ORIGIN_LATITUDE: f64 = 40.0;
const STANDARD_PARALLEL_1: f64 = 33.0;
const STANDARD_PARALLEL_2: f64 = 45.0;

/// The geodetic reference system in which input coordinates are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Datum {
    /// North American Datum 1983 (GRS80 ellipsoid)
    #[default]
    Nad83,
    /// World Geodetic System 1984
    Wgs84,
}

impl Datum {
    /// Square of the first eccentricity of the datum's ellipsoid
    fn eccentricity_squared(self) -> f64 {
        match self {
            Datum::Nad83 => 0.006_694_380_022_900_787,
            Datum::Wgs84 => 0.006_694_379_990_141_316,
        }
    }

    /// Latitude on the projection sphere of a point on the ellipsoid surface (radians)
    fn sphere_latitude(self, lat: f64) -> f64 {
        ((1.0 - self.eccentricity_squared()) * lat.tan()).atan()
    }

    /// Inverse of [`Datum::sphere_latitude`] (radians)
    fn geodetic_latitude(self, lat: f64) -> f64 {
        (lat.tan() / (1.0 - self.eccentricity_squared())).atan()
    }
}

impl FromStr for Datum {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("NAD83") {
            Ok(Datum::Nad83)
        } else if s.eq_ignore_ascii_case("WGS84") {
            Ok(Datum::Wgs84)
        } else {
            Err(ProjectionError::UnknownDatum(s.to_string()))
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Nad83 => write!(f, "NAD83"),
            Datum::Wgs84 => write!(f, "WGS84"),
        }
    }
}

/// Constants of the conic projection
struct Cone {
    /// Cone constant
    n: f64,
    /// Sphere radius multiplied by the mapping constant F
    rf: f64,
    /// Radius of the parallel through the origin latitude
    rho0: f64,
}

static CONE: LazyLock<Cone> = LazyLock::new(|| {
    let phi1 = STANDARD_PARALLEL_1.to_radians();
    let phi2 = STANDARD_PARALLEL_2.to_radians();
    let t = |phi: f64| (FRAC_PI_4 + phi / 2.0).tan();

    let n = (phi1.cos() / phi2.cos()).ln() / (t(phi2) / t(phi1)).ln();
    let rf = SPHERE_RADIUS * phi1.cos() * t(phi1).powf(n) / n;
    let rho0 = rf / t(ORIGIN_LATITUDE.to_radians()).powf(n);

    Cone { n, rf, rho0 }
});

fn check_coordinates(lon: f64, lat: f64) -> Result<(), ProjectionError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(ProjectionError::InvalidLatitude(lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(ProjectionError::InvalidLongitude(lon));
    }

    Ok(())
}

/// Project geodetic coordinates (in degrees) onto the grid.
///
/// The returned coordinates are continuous and one-based. Use [`grid_cell`] to obtain the cell
/// containing the point.
pub fn project(lon: f64, lat: f64, datum: Datum) -> Result<(f64, f64), ProjectionError> {
    check_coordinates(lon, lat)?;
    if lat <= -90.0 {
        // The cone's apex is at the north pole; the south pole maps to infinity
        return Err(ProjectionError::Unrepresentable { lon, lat });
    }

    let cone = &*CONE;
    let phi = datum.sphere_latitude(lat.to_radians());
    let rho = cone.rf / (FRAC_PI_4 + phi / 2.0).tan().powf(cone.n);
    if !rho.is_finite() {
        return Err(ProjectionError::Unrepresentable { lon, lat });
    }

    let theta = cone.n * (lon - CENTRAL_MERIDIAN).to_radians();
    let x = rho * theta.sin() + FALSE_EASTING;
    let y = cone.rho0 - rho * theta.cos() + FALSE_NORTHING;

    Ok((x / CELL_SIZE + 1.0, y / CELL_SIZE + 1.0))
}

/// Convert one-based grid coordinates back to geodetic coordinates `(lon, lat)` in degrees.
pub fn unproject(x: f64, y: f64, datum: Datum) -> Result<(f64, f64), ProjectionError> {
    if !(x.is_finite() && y.is_finite()) {
        return Err(ProjectionError::Unrepresentable { lon: x, lat: y });
    }

    let cone = &*CONE;
    let dx = (x - 1.0) * CELL_SIZE - FALSE_EASTING;
    let dy = cone.rho0 - ((y - 1.0) * CELL_SIZE - FALSE_NORTHING);
    let rho = dx.hypot(dy);
    let theta = dx.atan2(dy);

    let phi = if rho == 0.0 {
        std::f64::consts::FRAC_PI_2
    } else {
        2.0 * (cone.rf / rho).powf(1.0 / cone.n).atan() - std::f64::consts::FRAC_PI_2
    };
    let lon = CENTRAL_MERIDIAN + (theta / cone.n).to_degrees();
    let lat = datum.geodetic_latitude(phi).to_degrees();

    check_coordinates(lon, lat)?;
    Ok((lon, lat))
}

/// The one-based grid cell containing the given point.
///
/// The cell may lie outside the extent of the grid; callers are responsible for bounds checks.
pub fn grid_cell(lon: f64, lat: f64, datum: Datum) -> Result<(i64, i64), ProjectionError> {
    let (x, y) = project(lon, lat, datum)?;
    Ok((x.round() as i64, y.round() as i64))
}
