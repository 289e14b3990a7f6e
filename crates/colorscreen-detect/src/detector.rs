use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use colorscreen_core::ColorClass;
use colorscreen_progress::ProgressInfo;

use crate::classify::{classification_confidence, classify_color};
use crate::error::DetectError;

/// Tunable thresholds for [`detect_regular_screen`].
#[derive(Debug, Clone)]
pub struct ScrDetectParameters {
    /// The coarse search starts from an `n x n` grid of candidate seed
    /// windows before committing to a lattice spacing.
    pub seed_grid: usize,
    /// Initial guess at the lattice spacing, in pixels.
    pub initial_spacing: f64,
    /// A candidate patch is confirmed only if its classification
    /// confidence meets this threshold.
    pub confirm_confidence: f64,
    /// The detected lattice must cover at least this fraction of its
    /// axis-aligned bounding box to be accepted.
    pub min_coverage: f64,
}

impl Default for ScrDetectParameters {
    fn default() -> Self {
        ScrDetectParameters {
            seed_grid: 6,
            initial_spacing: 16.0,
            confirm_confidence: 0.08,
            min_coverage: 0.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectedPatch {
    pub x: f64,
    pub y: f64,
    pub color: ColorClass,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub patches: Vec<DetectedPatch>,
    pub spacing: f64,
    pub coverage: f64,
}

/// An entry in the expansion frontier, ordered so the highest-confidence
/// unconfirmed neighbor is explored first.
struct Candidate {
    gx: i64,
    gy: i64,
    confidence: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.confidence == other.confidence
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.confidence.total_cmp(&other.confidence)
    }
}

/// Searches `width x height` for a regular additive-color-screen lattice.
///
/// `sample(x, y)` returns the linear RGB value at image coordinates
/// `(x, y)`. The search proceeds in three stages: a coarse seed-grid scan
/// picks the most confident starting patch; a priority-queue-driven
/// flood fill grows the lattice outward from there, confirming each
/// candidate cell against [`ScrDetectParameters::confirm_confidence`];
/// finally the confirmed patch set is checked against
/// [`ScrDetectParameters::min_coverage`] before being returned.
pub fn detect_regular_screen(
    width: usize,
    height: usize,
    sample: impl Fn(f64, f64) -> [f64; 3],
    params: &ScrDetectParameters,
    progress: &ProgressInfo,
) -> Result<DetectionResult, DetectError> {
    progress.push("detect screen");
    let result = run_detection(width, height, sample, params, progress);
    progress.pop();
    result
}

fn run_detection(
    width: usize,
    height: usize,
    sample: impl Fn(f64, f64) -> [f64; 3],
    params: &ScrDetectParameters,
    progress: &ProgressInfo,
) -> Result<DetectionResult, DetectError> {
    let spacing = params.initial_spacing;
    let n = params.seed_grid.max(1);

    let mut best_seed: Option<(f64, f64, f64)> = None;
    for sy in 0..n {
        for sx in 0..n {
            let x = (sx as f64 + 0.5) * width as f64 / n as f64;
            let y = (sy as f64 + 0.5) * height as f64 / n as f64;
            let conf = classification_confidence(sample(x, y));
            if best_seed.map(|(_, _, c)| conf > c).unwrap_or(true) {
                best_seed = Some((x, y, conf));
            }
        }
    }
    let (seed_x, seed_y, _) = best_seed.ok_or(DetectError::NoSeedFound)?;

    let mut confirmed: HashMap<(i64, i64), DetectedPatch> = HashMap::new();
    let mut visited: HashSet<(i64, i64)> = HashSet::new();
    let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
    frontier.push(Candidate {
        gx: 0,
        gy: 0,
        confidence: 1.0,
    });

    while let Some(Candidate { gx, gy, .. }) = frontier.pop() {
        if progress.is_cancelled() {
            return Err(DetectError::Cancelled);
        }
        if !visited.insert((gx, gy)) {
            continue;
        }
        let x = seed_x + gx as f64 * spacing;
        let y = seed_y + gy as f64 * spacing;
        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            continue;
        }
        let rgb = sample(x, y);
        let confidence = classification_confidence(rgb);
        if confidence < params.confirm_confidence {
            continue;
        }
        confirmed.insert(
            (gx, gy),
            DetectedPatch {
                x,
                y,
                color: classify_color(rgb),
                confidence,
            },
        );
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let ngx = gx + dx;
            let ngy = gy + dy;
            if !visited.contains(&(ngx, ngy)) {
                frontier.push(Candidate {
                    gx: ngx,
                    gy: ngy,
                    confidence,
                });
            }
        }
    }

    let coverage = compute_coverage(&confirmed);
    if coverage < params.min_coverage {
        return Err(DetectError::InsufficientCoverage {
            coverage: coverage * 100.0,
            required: params.min_coverage * 100.0,
        });
    }

    Ok(DetectionResult {
        patches: confirmed.into_values().collect(),
        spacing,
        coverage,
    })
}

/// Fraction of the confirmed patches' axis-aligned grid bounding box that
/// was actually confirmed — a dense, unbroken lattice scores close to
/// 1.0, a scattered handful of lucky matches scores low.
fn compute_coverage(confirmed: &HashMap<(i64, i64), DetectedPatch>) -> f64 {
    if confirmed.is_empty() {
        return 0.0;
    }
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (i64::MAX, i64::MIN, i64::MAX, i64::MIN);
    for &(gx, gy) in confirmed.keys() {
        min_x = min_x.min(gx);
        max_x = max_x.max(gx);
        min_y = min_y.min(gy);
        max_y = max_y.max(gy);
    }
    let area = ((max_x - min_x + 1) * (max_y - min_y + 1)) as f64;
    confirmed.len() as f64 / area.max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_clean_synthetic_checkerboard() {
        let width = 200;
        let height = 200;
        let sample = |x: f64, y: f64| -> [f64; 3] {
            let gx = (x / 16.0) as i64;
            let gy = (y / 16.0) as i64;
            match (gx + gy).rem_euclid(3) {
                0 => [0.9, 0.05, 0.05],
                1 => [0.05, 0.9, 0.05],
                _ => [0.05, 0.05, 0.9],
            }
        };
        let params = ScrDetectParameters {
            initial_spacing: 16.0,
            ..Default::default()
        };
        let progress = ProgressInfo::new();
        let result = detect_regular_screen(width, height, sample, &params, &progress).unwrap();
        assert!(result.coverage > 0.9);
        assert!(result.patches.len() > 50);
    }

    #[test]
    fn rejects_pure_noise_as_insufficient_coverage() {
        let width = 100;
        let height = 100;
        let sample = |x: f64, y: f64| -> [f64; 3] {
            let h = ((x as i64 * 7919 + y as i64 * 104729) % 1000) as f64 / 1000.0;
            [h, h, h]
        };
        let params = ScrDetectParameters::default();
        let progress = ProgressInfo::new();
        let result = detect_regular_screen(width, height, sample, &params, &progress);
        assert!(result.is_err());
    }
}
