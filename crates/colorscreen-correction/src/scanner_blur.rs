use std::io::{BufRead, Write};

use crate::backlight::{GRID_H, GRID_W};
use crate::error::CorrectionError;

/// A per-region Gaussian blur-sigma grid, same `111x84` shape as
/// [`crate::BacklightCorrectionParameters`], used to compensate for a
/// scanner whose optical sharpness varies across the frame (commonly
/// worse toward the corners).
#[derive(Debug, Clone)]
pub struct ScannerBlurCorrectionParameters {
    width: usize,
    height: usize,
    sigma: Vec<f64>,
}

impl ScannerBlurCorrectionParameters {
    pub fn new(width: usize, height: usize) -> Self {
        ScannerBlurCorrectionParameters {
            width,
            height,
            sigma: vec![0.0; width * height],
        }
    }

    pub fn uniform(sigma: f64) -> Self {
        ScannerBlurCorrectionParameters {
            width: GRID_W,
            height: GRID_H,
            sigma: vec![sigma; GRID_W * GRID_H],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set(&mut self, cx: usize, cy: usize, sigma: f64) {
        self.sigma[cy * self.width + cx] = sigma;
    }

    /// Bilinearly samples the blur sigma at normalized image coordinates.
    pub fn sigma_at(&self, u: f64, v: f64) -> f64 {
        let gx = (u.clamp(0.0, 1.0) * (self.width - 1) as f64).clamp(0.0, (self.width - 1) as f64);
        let gy = (v.clamp(0.0, 1.0) * (self.height - 1) as f64).clamp(0.0, (self.height - 1) as f64);
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = gx - x0 as f64;
        let ty = gy - y0 as f64;
        let at = |x: usize, y: usize| self.sigma[y * self.width + x];
        let top = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
        let bottom = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    pub fn save(&self, mut w: impl Write) -> std::io::Result<()> {
        writeln!(w, "scanner_blur_correction_dimensions: {} {}", self.width, self.height)?;
        write!(w, "scanner_blur_correction_sigmas:")?;
        for v in &self.sigma {
            write!(w, " {v}")?;
        }
        writeln!(w)?;
        writeln!(w, "scanner_blur_correction_end")?;
        Ok(())
    }

    pub fn load(r: impl BufRead) -> Result<Self, CorrectionError> {
        let mut width = None;
        let mut height = None;
        let mut sigma = None;

        for line in r.lines() {
            let line = line?;
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("scanner_blur_correction_dimensions:") {
                let mut parts = rest.split_whitespace();
                width = parts.next().and_then(|s| s.parse().ok());
                height = parts.next().and_then(|s| s.parse().ok());
            } else if let Some(rest) = line.strip_prefix("scanner_blur_correction_sigmas:") {
                let values: Result<Vec<f64>, _> =
                    rest.split_whitespace().map(|s| s.parse::<f64>()).collect();
                sigma = Some(values.map_err(|_| {
                    CorrectionError::MalformedBacklight("non-numeric sigma value".into())
                })?);
            } else if line == "scanner_blur_correction_end" {
                break;
            }
        }

        let width = width
            .ok_or_else(|| CorrectionError::MalformedBacklight("missing dimensions".into()))?;
        let height = height
            .ok_or_else(|| CorrectionError::MalformedBacklight("missing dimensions".into()))?;
        let sigma =
            sigma.ok_or_else(|| CorrectionError::MalformedBacklight("missing sigmas".into()))?;
        if sigma.len() != width * height {
            return Err(CorrectionError::MalformedBacklight(
                "sigma count does not match dimensions".into(),
            ));
        }
        Ok(ScannerBlurCorrectionParameters { width, height, sigma })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn uniform_grid_returns_constant_sigma_everywhere() {
        let p = ScannerBlurCorrectionParameters::uniform(1.25);
        assert!((p.sigma_at(0.0, 0.0) - 1.25).abs() < 1e-9);
        assert!((p.sigma_at(0.9, 0.1) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn text_round_trips() {
        let mut p = ScannerBlurCorrectionParameters::new(3, 2);
        p.set(1, 1, 2.5);
        let mut buf = Vec::new();
        p.save(&mut buf).unwrap();
        let loaded = ScannerBlurCorrectionParameters::load(Cursor::new(buf)).unwrap();
        assert!((loaded.sigma_at(0.5, 1.0) - 2.5).abs() < 0.6);
    }
}
