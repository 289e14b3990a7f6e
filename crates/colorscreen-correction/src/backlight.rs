use std::io::{BufRead, Write};

use crate::error::CorrectionError;

/// Analysis/correction grid size. `backlight-correction-parameters.h`
/// fixes this at 111x84 cells across the frame.
pub const GRID_W: usize = 111;
pub const GRID_H: usize = 84;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Ir,
}

const CHANNELS: usize = 4;

fn channel_index(c: Channel) -> usize {
    match c {
        Channel::Red => 0,
        Channel::Green => 1,
        Channel::Blue => 2,
        Channel::Ir => 3,
    }
}

/// The raw per-cell measured luminosity, before the flat-field weights
/// are derived from it.
#[derive(Debug, Clone)]
pub struct BacklightCorrectionParameters {
    width: usize,
    height: usize,
    /// `lum[cell * CHANNELS + channel]`.
    lum: Vec<f64>,
}

impl BacklightCorrectionParameters {
    pub fn new(width: usize, height: usize) -> Self {
        BacklightCorrectionParameters {
            width,
            height,
            lum: vec![0.0; width * height * CHANNELS],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn lum(&self, cx: usize, cy: usize, channel: Channel) -> f64 {
        self.lum[(cy * self.width + cx) * CHANNELS + channel_index(channel)]
    }

    pub fn set_lum(&mut self, cx: usize, cy: usize, channel: Channel, value: f64) {
        self.lum[(cy * self.width + cx) * CHANNELS + channel_index(channel)] = value;
    }

    /// Analyzes a flat-field scan: `sample(x, y)` returns the raw
    /// `[r, g, b, ir]` value at image pixel `(x, y)`, `maxval` is the
    /// scanner's full-scale value (used to gamma-linearize samples
    /// before averaging), and `gamma` the scan's encoding gamma.
    ///
    /// Each grid cell's value is the interquartile mean (the sorted
    /// middle half) of its linearized samples, which rejects dust
    /// specks and screen-pattern residue that a plain mean would bake
    /// into the correction.
    pub fn analyze_scan(
        width: usize,
        height: usize,
        maxval: f64,
        gamma: f64,
        sample: impl Fn(usize, usize) -> [f64; 4],
    ) -> Self {
        let mut params = BacklightCorrectionParameters::new(GRID_W, GRID_H);
        let mut buckets: Vec<Vec<[f64; CHANNELS]>> = vec![Vec::new(); GRID_W * GRID_H];

        for y in 0..height {
            let cy = (y * GRID_H / height.max(1)).min(GRID_H - 1);
            for x in 0..width {
                let cx = (x * GRID_W / width.max(1)).min(GRID_W - 1);
                let raw = sample(x, y);
                let mut linear = [0.0; CHANNELS];
                for c in 0..CHANNELS {
                    linear[c] = (raw[c] / maxval).clamp(0.0, 1.0).powf(gamma);
                }
                buckets[cy * GRID_W + cx].push(linear);
            }
        }

        for (cell, samples) in buckets.iter_mut().enumerate() {
            for c in 0..CHANNELS {
                let mut values: Vec<f64> = samples.iter().map(|s| s[c]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap());
                params.lum[cell * CHANNELS + c] = interquartile_mean(&values);
            }
        }
        params
    }

    pub fn save(&self, mut w: impl Write) -> std::io::Result<()> {
        writeln!(w, "backlight_correction_dimensions: {} {}", self.width, self.height)?;
        writeln!(w, "backlight_correction_channels: {CHANNELS}")?;
        write!(w, "backlight_correction_lums:")?;
        for v in &self.lum {
            write!(w, " {v}")?;
        }
        writeln!(w)?;
        writeln!(w, "backlight_correction_end")?;
        Ok(())
    }

    pub fn load(r: impl BufRead) -> Result<Self, CorrectionError> {
        let mut width = None;
        let mut height = None;
        let mut lum = None;

        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("backlight_correction_dimensions:") {
                let mut parts = rest.split_whitespace();
                width = Some(parse_usize(&mut parts, "width")?);
                height = Some(parse_usize(&mut parts, "height")?);
            } else if let Some(rest) = line.strip_prefix("backlight_correction_channels:") {
                let n: usize = rest.trim().parse().map_err(|_| {
                    CorrectionError::MalformedBacklight("non-numeric channel count".into())
                })?;
                if n != CHANNELS {
                    return Err(CorrectionError::MalformedBacklight(format!(
                        "expected {CHANNELS} channels, found {n}"
                    )));
                }
            } else if let Some(rest) = line.strip_prefix("backlight_correction_lums:") {
                let values: Result<Vec<f64>, _> =
                    rest.split_whitespace().map(|s| s.parse::<f64>()).collect();
                lum = Some(values.map_err(|_| {
                    CorrectionError::MalformedBacklight("non-numeric luminosity value".into())
                })?);
            } else if line == "backlight_correction_end" {
                break;
            }
        }

        let width = width
            .ok_or_else(|| CorrectionError::MalformedBacklight("missing dimensions".into()))?;
        let height = height
            .ok_or_else(|| CorrectionError::MalformedBacklight("missing dimensions".into()))?;
        let lum =
            lum.ok_or_else(|| CorrectionError::MalformedBacklight("missing lums".into()))?;
        if lum.len() != width * height * CHANNELS {
            return Err(CorrectionError::MalformedBacklight(format!(
                "expected {} lum values, found {}",
                width * height * CHANNELS,
                lum.len()
            )));
        }
        Ok(BacklightCorrectionParameters { width, height, lum })
    }
}

fn parse_usize(
    parts: &mut std::str::SplitWhitespace,
    what: &str,
) -> Result<usize, CorrectionError> {
    parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CorrectionError::MalformedBacklight(format!("missing/non-numeric {what}")))
}

fn interquartile_mean(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    let lo = n / 4;
    let hi = (3 * n) / 4;
    let slice = if hi > lo { &sorted[lo..hi] } else { sorted };
    slice.iter().sum::<f64>() / slice.len() as f64
}

/// The derived per-cell weights: a multiplicative gain that normalizes
/// every cell back to the frame's overall average brightness, used to
/// cancel uneven backlight illumination.
#[derive(Debug, Clone)]
pub struct BacklightCorrection {
    width: usize,
    height: usize,
    mult: Vec<f64>,
}

/// Samples below this fraction of full scale are treated as black and
/// excluded from the weight computation, matching the original's
/// `epsilon = 1/256`.
const EPSILON: f64 = 1.0 / 256.0;

impl BacklightCorrection {
    /// Builds per-channel correction weights from measured cell
    /// luminosities. When `white_balance` is set, the R/G/B channels'
    /// frame-average targets are themselves averaged together first, so
    /// the correction also removes a uniform color cast rather than just
    /// flattening each channel independently.
    pub fn build(params: &BacklightCorrectionParameters, white_balance: bool) -> Self {
        let w = params.width;
        let h = params.height;
        let n = w * h;

        let mut target = [0.0; CHANNELS];
        for c in 0..CHANNELS {
            let sum: f64 = (0..n).map(|i| params.lum[i * CHANNELS + c]).sum();
            target[c] = if sum > EPSILON * n as f64 {
                sum / n as f64
            } else {
                1.0
            };
        }
        if white_balance {
            let rgb_avg = (target[0] + target[1] + target[2]) / 3.0;
            target[0] = rgb_avg;
            target[1] = rgb_avg;
            target[2] = rgb_avg;
        }

        let mut mult = vec![1.0; n * CHANNELS];
        for i in 0..n {
            for c in 0..CHANNELS {
                let lum = params.lum[i * CHANNELS + c];
                mult[i * CHANNELS + c] = if lum > EPSILON {
                    target[c] / lum
                } else {
                    target[c]
                };
            }
        }

        BacklightCorrection { width: w, height: h, mult }
    }

    /// Bilinearly samples the correction weight for `channel` at image
    /// coordinates normalized to `[0, 1] x [0, 1]`.
    pub fn apply(&self, u: f64, v: f64, channel: Channel) -> f64 {
        let c = channel_index(channel);
        let gx = (u.clamp(0.0, 1.0) * (self.width - 1) as f64).clamp(0.0, (self.width - 1) as f64);
        let gy = (v.clamp(0.0, 1.0) * (self.height - 1) as f64).clamp(0.0, (self.height - 1) as f64);
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = gx - x0 as f64;
        let ty = gy - y0 as f64;

        let at = |x: usize, y: usize| self.mult[(y * self.width + x) * CHANNELS + c];
        let top = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
        let bottom = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn flat_field_input_yields_unit_correction() {
        let params = BacklightCorrectionParameters::analyze_scan(64, 64, 255.0, 1.0, |_, _| {
            [200.0, 200.0, 200.0, 0.0]
        });
        let correction = BacklightCorrection::build(&params, false);
        assert!((correction.apply(0.5, 0.5, Channel::Red) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn darker_corner_gets_boosted() {
        let params = BacklightCorrectionParameters::analyze_scan(100, 100, 255.0, 1.0, |x, y| {
            let v = if x < 20 && y < 20 { 100.0 } else { 200.0 };
            [v, v, v, 0.0]
        });
        let correction = BacklightCorrection::build(&params, false);
        let corner = correction.apply(0.02, 0.02, Channel::Red);
        let center = correction.apply(0.5, 0.5, Channel::Red);
        assert!(corner > center);
    }

    #[test]
    fn text_round_trips_through_save_and_load() {
        let params = BacklightCorrectionParameters::analyze_scan(32, 32, 255.0, 1.0, |x, y| {
            [(x + y) as f64, x as f64, y as f64, 0.0]
        });
        let mut buf = Vec::new();
        params.save(&mut buf).unwrap();
        let loaded = BacklightCorrectionParameters::load(Cursor::new(buf)).unwrap();
        assert_eq!(loaded.width(), params.width());
        assert_eq!(loaded.height(), params.height());
        for cx in 0..GRID_W {
            for cy in 0..GRID_H {
                assert!((loaded.lum(cx, cy, Channel::Red) - params.lum(cx, cy, Channel::Red)).abs() < 1e-9);
            }
        }
    }
}
