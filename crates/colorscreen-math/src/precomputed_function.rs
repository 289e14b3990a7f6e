/// A piecewise-linear lookup table sampled at `n` uniformly spaced points
/// over `[x_min, x_max]`, evaluated by `apply` in O(1) via a floor-indexed
/// segment lookup, and invertible by `invert` via binary search under the
/// assumption that the sampled values are monotone.
///
/// This mirrors `precomputed_function<coord_t>`: values are stored as
/// `n - 1` `(slope, add)` segments rather than the raw samples, so `apply`
/// never has to recompute a slope on the hot path.
#[derive(Debug, Clone)]
pub struct PrecomputedFunction {
    x_min: f64,
    x_max: f64,
    step: f64,
    /// `y` at each of the `n` sample points, kept alongside the segment
    /// table because `invert` binary-searches directly on it.
    y: Vec<f64>,
    /// `(slope, add)` per segment: `apply(x) = add + slope * (x - x_min - i*step)`.
    segments: Vec<(f64, f64)>,
}

impl PrecomputedFunction {
    /// Builds the table directly from `n` uniformly spaced `y` samples
    /// over `[x_min, x_max]`.
    pub fn from_y_values(x_min: f64, x_max: f64, y: Vec<f64>) -> Self {
        assert!(y.len() >= 2, "need at least two samples to interpolate");
        let n = y.len();
        let step = (x_max - x_min) / (n - 1) as f64;
        let mut segments = Vec::with_capacity(n - 1);
        for i in 0..n - 1 {
            let slope = if step != 0.0 {
                (y[i + 1] - y[i]) / step
            } else {
                0.0
            };
            segments.push((slope, y[i]));
        }
        PrecomputedFunction {
            x_min,
            x_max,
            step,
            y,
            segments,
        }
    }

    /// Builds the table from scattered `(x, y)` control points by
    /// resampling them onto `len` uniform steps over their own x-range,
    /// then delegating to [`Self::from_y_values`].
    pub fn from_control_points(points: &[(f64, f64)], len: usize) -> Self {
        assert!(points.len() >= 2, "need at least two control points");
        assert!(len >= 2, "resampled table needs at least two points");
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        let x_min = pts.first().unwrap().0;
        let x_max = pts.last().unwrap().0;
        let step = (x_max - x_min) / (len - 1) as f64;

        let mut y = Vec::with_capacity(len);
        let mut seg = 0usize;
        for i in 0..len {
            let x = x_min + step * i as f64;
            while seg + 2 < pts.len() && pts[seg + 1].0 < x {
                seg += 1;
            }
            let (x0, y0) = pts[seg];
            let (x1, y1) = pts[seg + 1];
            let t = if x1 != x0 { (x - x0) / (x1 - x0) } else { 0.0 };
            y.push(y0 + t * (y1 - y0));
        }
        Self::from_y_values(x_min, x_max, y)
    }

    /// Evaluates the function at `x`, clamping to the table's domain.
    pub fn apply(&self, x: f64) -> f64 {
        let x = x.clamp(self.x_min, self.x_max);
        let pos = (x - self.x_min) / self.step;
        let idx = (pos as usize).min(self.segments.len() - 1);
        let (slope, add) = self.segments[idx];
        let local = x - (self.x_min + idx as f64 * self.step);
        add + slope * local
    }

    /// Inverts `y`, assuming the sampled values are monotone (either
    /// strictly increasing or strictly decreasing). Binary-searches the
    /// sample array for the bracketing segment, then linearly
    /// interpolates within it. Clamps to the domain endpoint when `y` is
    /// outside the table's range, rather than failing.
    pub fn invert(&self, y: f64) -> f64 {
        let increasing = self.y.last().unwrap() >= self.y.first().unwrap();
        let n = self.y.len();

        let mut lo = 0usize;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            let above = if increasing {
                self.y[mid] > y
            } else {
                self.y[mid] < y
            };
            if above {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let (y0, y1) = (self.y[lo], self.y[hi]);
        let (x0, x1) = (
            self.x_min + lo as f64 * self.step,
            self.x_min + hi as f64 * self.step,
        );
        if y1 != y0 {
            let t = (y - y0) / (y1 - y0);
            x0 + t * (x1 - x0)
        } else {
            x0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_matches_linear_function() {
        let f = PrecomputedFunction::from_y_values(0.0, 10.0, vec![0.0, 5.0, 10.0]);
        assert!((f.apply(2.5) - 2.5).abs() < 1e-9);
        assert!((f.apply(7.5) - 7.5).abs() < 1e-9);
    }

    #[test]
    fn apply_clamps_outside_domain() {
        let f = PrecomputedFunction::from_y_values(0.0, 1.0, vec![0.0, 1.0]);
        assert_eq!(f.apply(-5.0), 0.0);
        assert_eq!(f.apply(5.0), 1.0);
    }

    #[test]
    fn invert_round_trips_monotone_function() {
        let f = PrecomputedFunction::from_y_values(0.0, 10.0, vec![0.0, 3.0, 9.0, 20.0]);
        for x in [0.5, 2.0, 4.2, 9.9] {
            let y = f.apply(x);
            let back = f.invert(y);
            assert!((back - x).abs() < 1e-3, "x={x} back={back}");
        }
    }

    #[test]
    fn invert_handles_decreasing_function() {
        let f = PrecomputedFunction::from_y_values(0.0, 10.0, vec![10.0, 6.0, 1.0]);
        let y = f.apply(3.0);
        assert!((f.invert(y) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn control_points_resample_onto_uniform_grid() {
        let pts = [(0.0, 0.0), (1.0, 1.0), (3.0, 9.0)];
        let f = PrecomputedFunction::from_control_points(&pts, 50);
        assert!((f.apply(1.0) - 1.0).abs() < 0.05);
        assert!((f.apply(3.0) - 9.0).abs() < 0.05);
    }
}
