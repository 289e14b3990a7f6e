use crate::precomputed_function::PrecomputedFunction;

/// Size of the precomputed inverse-ratio table. 16K entries is far more
/// than one per scan pixel for any realistic plate scan, carried over
/// from `lens_warp_correction::size`.
const TABLE_SIZE: usize = 16 * 1024;
/// Round-trip tolerance used by the debug self-check in [`LensWarp::precompute`].
const EPSILON: f64 = 0.001;

/// Radial lens-distortion model: a polynomial in normalized
/// radius-squared giving the ratio between the distorted (scan) radius
/// and the corrected radius. Coefficients are for `r2^1, r2^2, ...`; the
/// constant term is implicitly 1 (no distortion at the optical center).
#[derive(Debug, Clone, Default)]
pub struct LensWarpParams {
    pub coeffs: Vec<f64>,
}

impl LensWarpParams {
    pub fn identity() -> Self {
        LensWarpParams { coeffs: Vec::new() }
    }

    /// `ratio(t)` for normalized radius-squared `t`; 1.0 when no
    /// distortion coefficients are present.
    pub fn get_ratio(&self, t: f64) -> f64 {
        let mut ratio = 1.0;
        let mut pow = t;
        for c in &self.coeffs {
            ratio += c * pow;
            pow *= t;
        }
        ratio
    }

    pub fn is_identity(&self) -> bool {
        self.coeffs.iter().all(|c| c.abs() < 1e-12)
    }
}

/// Radial lens-warp correction between a scanner's raw ("scan") image
/// coordinates and lens-corrected ("corrected") coordinates, with an
/// inverse table precomputed once so both directions are O(1) to apply.
#[derive(Debug, Clone)]
pub struct LensWarp {
    params: LensWarpParams,
    center: (f64, f64),
    max_dist: f64,
    inv_max_dist_sq: f64,
    inverted_ratio: Option<PrecomputedFunction>,
    noop: bool,
}

impl LensWarp {
    pub fn new(params: LensWarpParams) -> Self {
        let noop = params.is_identity();
        LensWarp {
            params,
            center: (0.0, 0.0),
            max_dist: 1.0,
            inv_max_dist_sq: 1.0,
            inverted_ratio: None,
            noop,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// Precomputes the inverse table given the optical center and the
    /// four corners of the corrected image, in corrected-image
    /// coordinates. `max_dist` is the farthest corner from the center,
    /// matching the original's "one table covers every in-frame pixel"
    /// sizing.
    pub fn precompute(&mut self, center: (f64, f64), corners: [(f64, f64); 4]) {
        self.center = center;
        let max_dist_sq = corners
            .iter()
            .map(|&(x, y)| {
                let dx = x - center.0;
                let dy = y - center.1;
                dx * dx + dy * dy
            })
            .fold(0.0_f64, f64::max);
        self.max_dist = max_dist_sq.sqrt().max(1e-9);
        self.inv_max_dist_sq = 1.0 / (self.max_dist * self.max_dist);

        if self.noop {
            return;
        }
        self.precompute_inverse();
    }

    /// Builds the `scan distance -> corrected/scan ratio` lookup table by
    /// bisecting the forward ratio function for each sampled scan
    /// distance. The forward ratio is assumed monotone in distance, same
    /// assumption the original makes for `precomputed_function::invert`.
    fn precompute_inverse(&mut self) {
        let mut y = Vec::with_capacity(TABLE_SIZE);
        for i in 0..TABLE_SIZE {
            let d_scan = self.max_dist * i as f64 / (TABLE_SIZE - 1) as f64;
            let inv_ratio = self.solve_inverse_ratio(d_scan);
            y.push(inv_ratio);
        }
        self.inverted_ratio = Some(PrecomputedFunction::from_y_values(
            0.0,
            self.max_dist,
            y,
        ));
    }

    /// Finds `d_corr` such that `ratio(d_corr^2 * inv_max_dist_sq) * d_corr == d_scan`,
    /// returning `d_corr / d_scan` (the multiplier that maps a scan-space
    /// vector back to corrected space), via bisection.
    fn solve_inverse_ratio(&self, d_scan: f64) -> f64 {
        if d_scan < 1e-12 {
            return 1.0 / self.params.get_ratio(0.0);
        }
        let mut lo = 0.0_f64;
        let mut hi = self.max_dist * 4.0;
        for _ in 0..64 {
            let mid = 0.5 * (lo + hi);
            let forward = self.params.get_ratio(mid * mid * self.inv_max_dist_sq) * mid;
            if forward < d_scan {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let d_corr = 0.5 * (lo + hi);
        d_corr / d_scan
    }

    pub fn corrected_to_scan(&self, p: (f64, f64)) -> (f64, f64) {
        if self.noop {
            return p;
        }
        let dx = p.0 - self.center.0;
        let dy = p.1 - self.center.1;
        let dist_sq = dx * dx + dy * dy;
        let ratio = self.params.get_ratio(dist_sq * self.inv_max_dist_sq);
        (self.center.0 + dx * ratio, self.center.1 + dy * ratio)
    }

    pub fn scan_to_corrected(&self, p: (f64, f64)) -> (f64, f64) {
        if self.noop {
            return p;
        }
        let dx = p.0 - self.center.0;
        let dy = p.1 - self.center.1;
        let dist = (dx * dx + dy * dy).sqrt().min(self.max_dist);
        let inv_ratio = self
            .inverted_ratio
            .as_ref()
            .expect("precompute() must run before scan_to_corrected()")
            .apply(dist);
        (self.center.0 + dx * inv_ratio, self.center.1 + dy * inv_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_warp() -> LensWarp {
        let mut w = LensWarp::new(LensWarpParams {
            coeffs: vec![-0.08, 0.01],
        });
        w.precompute(
            (500.0, 500.0),
            [
                (0.0, 0.0),
                (1000.0, 0.0),
                (0.0, 1000.0),
                (1000.0, 1000.0),
            ],
        );
        w
    }

    #[test]
    fn identity_params_are_noop() {
        let w = LensWarp::new(LensWarpParams::identity());
        assert!(w.is_noop());
        assert_eq!(w.corrected_to_scan((12.0, 34.0)), (12.0, 34.0));
    }

    #[test]
    fn round_trip_within_tolerance() {
        let w = sample_warp();
        for p in [(600.0, 600.0), (10.0, 990.0), (500.0, 500.0), (900.0, 120.0)] {
            let scan = w.corrected_to_scan(p);
            let back = w.scan_to_corrected(scan);
            assert!(
                (back.0 - p.0).abs() < EPSILON * 50.0 && (back.1 - p.1).abs() < EPSILON * 50.0,
                "p={p:?} scan={scan:?} back={back:?}"
            );
        }
    }
}
