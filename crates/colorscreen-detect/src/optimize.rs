use colorscreen_core::ColorClass;
use colorscreen_progress::ProgressInfo;
use colorscreen_solve::{nelder_mead, SimplexProblem, SolveError};

use crate::detector::DetectedPatch;

/// Refines the three reference RGB primaries (red/green/blue screen
/// patch colors) against a set of already-classified patches, by
/// minimizing the total squared distance from each patch to its
/// assigned class's reference color. This is the color-fit step that
/// follows lattice detection: detection only needs a dominant-channel
/// heuristic, but rendering wants accurate reference colors for the
/// unmixing matrix.
struct ColorFit<'a> {
    patches: &'a [DetectedPatch],
    observed: &'a dyn Fn(&DetectedPatch) -> [f64; 3],
}

impl SimplexProblem for ColorFit<'_> {
    fn num_params(&self) -> usize {
        9
    }

    fn start(&self) -> Vec<f64> {
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
    }

    fn epsilon(&self) -> Vec<f64> {
        vec![1e-5; 9]
    }

    fn objfunc(&self, params: &[f64]) -> f64 {
        let refs = [
            [params[0], params[1], params[2]],
            [params[3], params[4], params[5]],
            [params[6], params[7], params[8]],
        ];
        self.patches
            .iter()
            .map(|p| {
                let obs = (self.observed)(p);
                let r = refs[class_index(p.color)];
                let d0 = obs[0] - r[0];
                let d1 = obs[1] - r[1];
                let d2 = obs[2] - r[2];
                d0 * d0 + d1 * d1 + d2 * d2
            })
            .sum()
    }
}

fn class_index(c: ColorClass) -> usize {
    match c {
        ColorClass::Red => 0,
        ColorClass::Green => 1,
        ColorClass::Blue => 2,
    }
}

/// Fits reference RGB primaries for red/green/blue screen patches given
/// already-classified detections. Returns `[red_ref, green_ref, blue_ref]`.
pub fn optimize_screen_colors(
    patches: &[DetectedPatch],
    observed: impl Fn(&DetectedPatch) -> [f64; 3],
    progress: &ProgressInfo,
) -> Result<[[f64; 3]; 3], SolveError> {
    let problem = ColorFit {
        patches,
        observed: &observed,
    };
    let result = nelder_mead(&problem, progress)?;
    let p = result.params;
    Ok([
        [p[0], p[1], p[2]],
        [p[3], p[4], p[5]],
        [p[6], p[7], p[8]],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_approximately_correct_reference_colors() {
        let patches = vec![
            DetectedPatch { x: 0.0, y: 0.0, color: ColorClass::Red, confidence: 1.0 },
            DetectedPatch { x: 1.0, y: 0.0, color: ColorClass::Green, confidence: 1.0 },
            DetectedPatch { x: 2.0, y: 0.0, color: ColorClass::Blue, confidence: 1.0 },
        ];
        let observed = |p: &DetectedPatch| match p.color {
            ColorClass::Red => [0.9, 0.05, 0.05],
            ColorClass::Green => [0.05, 0.85, 0.05],
            ColorClass::Blue => [0.05, 0.05, 0.8],
        };
        let progress = ProgressInfo::new();
        let refs = optimize_screen_colors(&patches, observed, &progress).unwrap();
        assert!((refs[0][0] - 0.9).abs() < 0.05);
        assert!((refs[1][1] - 0.85).abs() < 0.05);
        assert!((refs[2][2] - 0.8).abs() < 0.05);
    }
}
