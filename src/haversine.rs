//! Great-circle distances for the offline ordering heuristic.
//!
//! Straight-line only, so it ignores roads. Good enough to rank which stop is
//! nearest, not to estimate arrival times precisely.

use std::time::Duration;

use rayon::prelude::*;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Haversine of an angle in radians.
fn hav(theta: f64) -> f64 {
    let half = (theta * 0.5).sin();
    half * half
}

/// Great-circle distance in km between two `(lat, lng)` points in degrees.
pub fn haversine_km((lat_a, lng_a): (f64, f64), (lat_b, lng_b): (f64, f64)) -> f64 {
    let (phi_a, phi_b) = (lat_a.to_radians(), lat_b.to_radians());
    let h = hav(phi_b - phi_a) + phi_a.cos() * phi_b.cos() * hav((lng_b - lng_a).to_radians());
    // Rounding can push h a hair past 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * h.min(1.0).sqrt().asin()
}

/// Straight-line distance matrix with a flat speed for rough drive times.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_KMH)
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Pairwise distances in km, indexed by input order. Only the upper
    /// triangle is computed (rows in parallel) and then mirrored.
    pub fn distances_km(&self, locations: &[(f64, f64)]) -> Vec<Vec<f64>> {
        let n = locations.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                locations[i + 1..]
                    .iter()
                    .map(|&to| haversine_km(locations[i], to))
                    .collect()
            })
            .collect();

        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in upper.iter().enumerate() {
            for (offset, &km) in row.iter().enumerate() {
                let j = i + 1 + offset;
                matrix[i][j] = km;
                matrix[j][i] = km;
            }
        }
        matrix
    }

    /// Rough drive time for `km` at the configured speed. Saturates when the
    /// speed is zero or negative.
    pub fn drive_time(&self, km: f64) -> Duration {
        Duration::try_from_secs_f64(km / self.speed_kmh * 3600.0).unwrap_or(Duration::MAX)
    }
}
