use colorscreen_core::Point;
use colorscreen_progress::ProgressInfo;

use crate::render_type::RenderType;
use crate::renderer::{RenderError, Renderer, TileRequest};

/// One scan placed within a stitched composite, positioned by its
/// top-left corner in final-image coordinates.
pub struct StitchTile {
    pub renderer: Renderer,
    pub raw_sample: Box<dyn Fn(Point) -> [f64; 3] + Send + Sync>,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A multi-tile scan stitched into a single composite. Overlapping
/// regions are blended by inverse-distance-to-edge weighting so a seam
/// doesn't show a hard cut where one tile's vignette differs from its
/// neighbor's.
pub struct StitchProject {
    tiles: Vec<StitchTile>,
    width: usize,
    height: usize,
}

impl StitchProject {
    pub fn new(width: usize, height: usize) -> Self {
        StitchProject {
            tiles: Vec::new(),
            width,
            height,
        }
    }

    pub fn add_tile(&mut self, tile: StitchTile) {
        self.tiles.push(tile);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Renders the full composite at `render_type`, blending overlapping
    /// tiles. Tiles that don't cover a given output pixel are skipped;
    /// pixels covered by no tile come back as black.
    pub fn render(
        &self,
        render_type: RenderType,
        progress: &ProgressInfo,
    ) -> Result<Vec<[f64; 3]>, RenderError> {
        progress.push("stitch composite");
        let mut accum = vec![[0.0f64; 3]; self.width * self.height];
        let mut weight = vec![0.0f64; self.width * self.height];

        for tile in &self.tiles {
            if progress.is_cancelled() {
                progress.pop();
                return Err(RenderError::Cancelled);
            }
            let request = TileRequest {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
                render_type,
                supersample: 1,
            };
            let _ = request;
            for y in 0..self.height {
                for x in 0..self.width {
                    let local_x = x as f64 - tile.offset_x;
                    let local_y = y as f64 - tile.offset_y;
                    let px = match tile.renderer.sample_pixel_img(
                        Point::new(local_x, local_y),
                        render_type,
                        tile.raw_sample.as_ref(),
                    ) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    let w = edge_weight(local_x, local_y);
                    if w <= 0.0 {
                        continue;
                    }
                    let idx = y * self.width + x;
                    accum[idx][0] += px[0] * w;
                    accum[idx][1] += px[1] * w;
                    accum[idx][2] += px[2] * w;
                    weight[idx] += w;
                }
            }
        }

        let mut out = vec![[0.0; 3]; self.width * self.height];
        for i in 0..out.len() {
            if weight[i] > 0.0 {
                out[i] = [
                    accum[i][0] / weight[i],
                    accum[i][1] / weight[i],
                    accum[i][2] / weight[i],
                ];
            }
        }
        progress.pop();
        Ok(out)
    }

    /// Compares two overlapping tiles in their shared region and returns
    /// the mean absolute per-channel difference, for judging stitch
    /// quality at the seam between them.
    pub fn seam_error(&self, a: usize, b: usize, progress: &ProgressInfo) -> Option<f64> {
        let ta = self.tiles.get(a)?;
        let tb = self.tiles.get(b)?;
        let mut total = 0.0;
        let mut count = 0usize;
        for y in 0..self.height {
            if progress.is_cancelled() {
                return None;
            }
            for x in 0..self.width {
                let pa = ta.renderer.sample_pixel_img(
                    Point::new(x as f64 - ta.offset_x, y as f64 - ta.offset_y),
                    RenderType::Original,
                    ta.raw_sample.as_ref(),
                );
                let pb = tb.renderer.sample_pixel_img(
                    Point::new(x as f64 - tb.offset_x, y as f64 - tb.offset_y),
                    RenderType::Original,
                    tb.raw_sample.as_ref(),
                );
                if let (Ok(pa), Ok(pb)) = (pa, pb) {
                    total += (pa[0] - pb[0]).abs() + (pa[1] - pb[1]).abs() + (pa[2] - pb[2]).abs();
                    count += 1;
                }
            }
        }
        if count == 0 {
            None
        } else {
            Some(total / (count as f64 * 3.0))
        }
    }
}

/// Weight that falls off toward the edge of a tile's frame, so overlap
/// blending favors whichever tile's sample is furthest from its own
/// border.
fn edge_weight(x: f64, y: f64) -> f64 {
    if x < 0.0 || y < 0.0 {
        return 0.0;
    }
    (x.min(y) + 1.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorscreen_geometry::ScrToImgParams;
    use colorscreen_screen::ScreenTile;
    use std::sync::Arc;

    #[test]
    fn single_tile_composite_reproduces_its_own_samples() {
        let mut project = StitchProject::new(4, 4);
        let renderer = Renderer::new(
            Arc::new(colorscreen_geometry::ScrToImg::new(ScrToImgParams::default())),
            Arc::new(ScreenTile::identity()),
        );
        project.add_tile(StitchTile {
            renderer,
            raw_sample: Box::new(|_p| [0.3, 0.3, 0.3]),
            offset_x: 0.0,
            offset_y: 0.0,
        });
        let progress = ProgressInfo::new();
        let out = project.render(RenderType::Original, &progress).unwrap();
        assert!(out.iter().any(|p| p[0] > 0.0));
    }
}
