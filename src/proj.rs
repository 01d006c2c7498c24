//! WGS84 <-> UTM coordinate transform.
//!
//! The artifact stores node positions in a single projected UTM zone, the one
//! the offline pipeline projected into, so Euclidean distance in graph space
//! approximates metres on the ground. Requests arrive in geographic
//! longitude/latitude; every request reprojects its points and polygon rings
//! into that zone, and the winning path reprojects back.
//!
//! Implementation: transverse Mercator via the Krueger series, 6th order in
//! the third flattening. Forward and inverse are consistent truncations of
//! the same series, so a round trip reproduces the input to well below
//! 1e-9 degrees. Pure math: no grids, no tables, no I/O.

use crate::error::ProjError;

/// WGS84 semi-major axis (metres).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central-meridian scale factor.
const K0: f64 = 0.9996;
/// UTM false easting (metres).
const FALSE_EASTING: f64 = 500_000.0;
/// UTM false northing for southern-hemisphere zones (metres).
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Bidirectional transform between EPSG:4326 and one fixed UTM zone.
///
/// Built once at startup from the EPSG code recorded in the artifact header;
/// shared read-only by every request.
#[derive(Debug, Clone)]
pub struct Projection {
    epsg: u32,
    /// Central meridian of the zone, radians.
    lon0: f64,
    false_northing: f64,
    /// First eccentricity.
    e: f64,
    /// Rectifying radius scaled by k0: the factor between series space and
    /// projected metres.
    scale: f64,
    /// Forward series coefficients.
    alpha: [f64; 6],
    /// Inverse series coefficients.
    beta: [f64; 6],
}

impl Projection {
    /// Build the transform pair for a UTM target CRS.
    ///
    /// The geographic side is always EPSG:4326. Codes outside the UTM ranges
    /// are rejected; the caller treats that as fatal configuration.
    pub fn new(target_epsg: u32) -> Result<Self, ProjError> {
        let (zone, south) = match target_epsg {
            32601..=32660 => (target_epsg - 32600, false),
            32701..=32760 => (target_epsg - 32700, true),
            other => return Err(ProjError::UnsupportedCrs(other)),
        };

        let lon0 = f64::from(zone * 6) - 183.0;
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        // Rectifying radius A = a/(1+n) * (1 + n^2/4 + n^4/64 + n^6/256).
        let rect = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0
                - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37_800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1_983_433.0 * n6 / 1_935_360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15_061.0 * n5 / 26_880.0
                + 167_603.0 * n6 / 181_440.0,
            49_561.0 * n4 / 161_280.0 - 179.0 * n5 / 168.0 + 6_601_661.0 * n6 / 7_257_600.0,
            34_729.0 * n5 / 80_640.0 - 3_418_889.0 * n6 / 1_995_840.0,
            212_378_941.0 * n6 / 319_334_400.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96_199.0 * n6 / 604_800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1_118_711.0 * n6 / 3_870_720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0
                + 5569.0 * n6 / 90_720.0,
            4397.0 * n4 / 161_280.0 - 11.0 * n5 / 504.0 - 830_251.0 * n6 / 7_257_600.0,
            4583.0 * n5 / 161_280.0 - 108_847.0 * n6 / 3_991_680.0,
            20_648_693.0 * n6 / 638_668_800.0,
        ];

        Ok(Self {
            epsg: target_epsg,
            lon0: lon0.to_radians(),
            false_northing: if south { FALSE_NORTHING_SOUTH } else { 0.0 },
            e: (WGS84_F * (2.0 - WGS84_F)).sqrt(),
            scale: K0 * rect,
            alpha,
            beta,
        })
    }

    /// Target CRS this projection maps into.
    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Geographic (lon, lat) degrees -> projected (x, y) metres.
    pub fn to_metric(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lam = lon.to_radians() - self.lon0;

        let taup = taupf(phi.tan(), self.e);
        let xi0 = taup.atan2(lam.cos());
        let eta0 = (lam.sin() / taup.hypot(lam.cos())).asinh();

        let mut xi = xi0;
        let mut eta = eta0;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi0).sin() * (k * eta0).cosh();
            eta += a * (k * xi0).cos() * (k * eta0).sinh();
        }

        (
            FALSE_EASTING + self.scale * eta,
            self.false_northing + self.scale * xi,
        )
    }

    /// Projected (x, y) metres -> geographic (lon, lat) degrees.
    pub fn to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let xi = (y - self.false_northing) / self.scale;
        let eta = (x - FALSE_EASTING) / self.scale;

        let mut xi0 = xi;
        let mut eta0 = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi0 -= b * (k * xi).sin() * (k * eta).cosh();
            eta0 -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let taup = xi0.sin() / eta0.sinh().hypot(xi0.cos());
        let lam = eta0.sinh().atan2(xi0.cos());
        let phi = tauf(taup, self.e).atan();

        ((self.lon0 + lam).to_degrees(), phi.to_degrees())
    }
}

/// tan(conformal latitude) from tan(geographic latitude).
fn taupf(tau: f64, e: f64) -> f64 {
    let tau1 = tau.hypot(1.0);
    let sig = (e * (e * tau / tau1).atanh()).sinh();
    sig.hypot(1.0) * tau - sig * tau1
}

/// tan(geographic latitude) from tan(conformal latitude), by Newton
/// iteration on `taupf`. Converges in 2-3 steps for any real latitude.
fn tauf(taup: f64, e: f64) -> f64 {
    let e2m = 1.0 - e * e;
    let tol = f64::EPSILON.sqrt() * taup.abs().max(1.0) * 0.1;
    let mut tau = taup / e2m;
    for _ in 0..5 {
        let taupa = taupf(tau, e);
        let dtau =
            (taup - taupa) * (1.0 + e2m * tau * tau) / (e2m * tau.hypot(1.0) * taupa.hypot(1.0));
        tau += dtau;
        if dtau.abs() < tol {
            break;
        }
    }
    tau
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_utm_codes() {
        assert!(Projection::new(4326).is_err());
        assert!(Projection::new(3857).is_err());
        assert!(Projection::new(32661).is_err());
        assert!(Projection::new(0).is_err());
    }

    #[test]
    fn test_accepts_both_hemispheres() {
        assert!(Projection::new(32610).is_ok());
        assert!(Projection::new(32601).is_ok());
        assert!(Projection::new(32760).is_ok());
    }

    #[test]
    fn test_known_point_utm_10n() {
        // Vancouver-ish, well inside zone 10N. Reference easting/northing
        // computed independently; series agree to centimetres or better.
        let p = Projection::new(32610).unwrap();
        let (x, y) = p.to_metric(-123.1, 49.25);
        assert!((x - 492_722.4).abs() < 1.0, "easting {x}");
        assert!((y - 5_455_252.5).abs() < 1.0, "northing {y}");
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let p = Projection::new(32610).unwrap();
        let (x, _) = p.to_metric(-123.0, 45.0);
        assert!((x - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_round_trip_degrees() {
        let p = Projection::new(32610).unwrap();
        for &(lon, lat) in &[
            (-123.0, 0.0),
            (-123.1, 49.2827),
            (-122.3, 37.77),
            (-125.9, 61.5),
            (-120.1, 8.3),
        ] {
            let (x, y) = p.to_metric(lon, lat);
            let (lon2, lat2) = p.to_geo(x, y);
            assert!((lon - lon2).abs() < 1e-9, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-9, "lat {lat} -> {lat2}");
        }
    }

    #[test]
    fn test_round_trip_southern_hemisphere() {
        let p = Projection::new(32723).unwrap();
        let (x, y) = p.to_metric(-44.8, -23.4);
        assert!(y > 0.0 && y < FALSE_NORTHING_SOUTH);
        let (lon2, lat2) = p.to_geo(x, y);
        assert!((lon2 + 44.8).abs() < 1e-9);
        assert!((lat2 + 23.4).abs() < 1e-9);
    }
}
