use colorscreen_core::{ColorClass, Point, ScannerType};
use colorscreen_math::{LensWarp, PrecomputedFunction};

use crate::mesh::Mesh;

/// Everything needed to map between screen-lattice coordinates and the
/// scanned image: the affine basis (screen unit vectors expressed in
/// image space plus the image-space origin), an optional perspective
/// term, lens-warp correction, an optional motor-speed correction for
/// scanners that move the lens during capture, and an optional dense
/// mesh for residual nonlinear distortion.
#[derive(Debug, Clone)]
pub struct ScrToImgParams {
    pub origin: Point,
    pub basis_x: Point,
    pub basis_y: Point,
    /// Projective denominator coefficients: `w = 1 + px*sx + py*sy`.
    pub perspective: (f64, f64),
    pub scanner_type: ScannerType,
    pub final_rotation: f64,
    pub final_ratio: f64,
}

impl Default for ScrToImgParams {
    fn default() -> Self {
        ScrToImgParams {
            origin: Point::ZERO,
            basis_x: Point::new(1.0, 0.0),
            basis_y: Point::new(0.0, 1.0),
            perspective: (0.0, 0.0),
            scanner_type: ScannerType::FixedLens,
            final_rotation: 0.0,
            final_ratio: 1.0,
        }
    }
}

/// The full screen-lattice <-> scanned-image <-> presentation coordinate
/// map, composed of an affine+perspective basis change, optional lens
/// warp, optional motor correction, and optional mesh.
#[derive(Debug, Clone)]
pub struct ScrToImg {
    params: ScrToImgParams,
    lens: Option<LensWarp>,
    motor_correction: Option<PrecomputedFunction>,
    mesh: Option<Mesh>,
}

impl ScrToImg {
    pub fn new(params: ScrToImgParams) -> Self {
        ScrToImg {
            params,
            lens: None,
            motor_correction: None,
            mesh: None,
        }
    }

    pub fn with_lens(mut self, lens: LensWarp) -> Self {
        self.lens = Some(lens);
        self
    }

    pub fn with_motor_correction(mut self, f: PrecomputedFunction) -> Self {
        self.motor_correction = Some(f);
        self
    }

    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    fn affine_forward(&self, scr: Point) -> Point {
        let v = self.params.basis_x * scr.x + self.params.basis_y * scr.y + self.params.origin;
        let w = 1.0 + self.params.perspective.0 * scr.x + self.params.perspective.1 * scr.y;
        if w.abs() > 1e-12 {
            v * (1.0 / w)
        } else {
            v
        }
    }

    fn affine_inverse(&self, img: Point) -> Point {
        // Invert the affine part exactly; the perspective term is folded
        // back in by a couple of fixed-point passes since it depends on
        // the unknown screen coordinate itself.
        let det = self.params.basis_x.x * self.params.basis_y.y
            - self.params.basis_x.y * self.params.basis_y.x;
        let mut scr = Point::ZERO;
        for _ in 0..4 {
            let w =
                1.0 + self.params.perspective.0 * scr.x + self.params.perspective.1 * scr.y;
            let rel = img * w - self.params.origin;
            scr = Point::new(
                (rel.x * self.params.basis_y.y - rel.y * self.params.basis_y.x) / det,
                (self.params.basis_x.x * rel.y - self.params.basis_x.y * rel.x) / det,
            );
        }
        scr
    }

    /// Screen lattice coordinates to scanned-image pixel coordinates.
    pub fn to_img(&self, scr: Point) -> Point {
        let mut p = self.affine_forward(scr);
        if let Some(lens) = &self.lens {
            let (x, y) = lens.corrected_to_scan((p.x, p.y));
            p = Point::new(x, y);
        }
        if let Some(motor) = &self.motor_correction {
            p = apply_motor(p, self.params.scanner_type, motor, true);
        }
        if let Some(mesh) = &self.mesh {
            p = mesh.apply(p);
        }
        p
    }

    /// Scanned-image pixel coordinates to screen lattice coordinates.
    pub fn to_scr(&self, img: Point) -> Point {
        let mut p = img;
        if let Some(mesh) = &self.mesh {
            p = mesh.invert(p);
        }
        if let Some(motor) = &self.motor_correction {
            p = apply_motor(p, self.params.scanner_type, motor, false);
        }
        if let Some(lens) = &self.lens {
            let (x, y) = lens.scan_to_corrected((p.x, p.y));
            p = Point::new(x, y);
        }
        self.affine_inverse(p)
    }

    /// Screen to presentation ("final") space: image space rotated and
    /// rescaled by the output rotation/aspect adjustment.
    pub fn scr_to_final(&self, scr: Point) -> Point {
        rotate_scale(self.to_img(scr), self.params.final_rotation, self.params.final_ratio)
    }

    pub fn final_to_scr(&self, final_p: Point) -> Point {
        let img = rotate_scale(final_p, -self.params.final_rotation, 1.0 / self.params.final_ratio);
        self.to_scr(img)
    }

    /// The rectangular section of the screen lattice that the whole
    /// `img_w` x `img_h` scanned image falls within: a screen-space
    /// rectangle of size `(scr_width, scr_height)` starting at
    /// `(-scr_xshift, -scr_yshift)`.
    ///
    /// Maps the four image-space corners through [`ScrToImg::to_scr`],
    /// then densely samples along all four image edges, since lens
    /// warp or tilt can bow the corner-to-corner mapping enough that
    /// the true extrema fall strictly inside an edge rather than at a
    /// corner.
    pub fn get_range(&self, img_w: f64, img_h: f64) -> (i64, i64, i64, i64) {
        const STEPS: i64 = 16 * 1024;

        let mut minx = f64::INFINITY;
        let mut miny = f64::INFINITY;
        let mut maxx = f64::NEG_INFINITY;
        let mut maxy = f64::NEG_INFINITY;
        let mut visit = |p: Point| {
            minx = minx.min(p.x);
            miny = miny.min(p.y);
            maxx = maxx.max(p.x);
            maxy = maxy.max(p.y);
        };

        visit(self.to_scr(Point::new(0.0, 0.0)));
        visit(self.to_scr(Point::new(img_w, 0.0)));
        visit(self.to_scr(Point::new(0.0, img_h)));
        visit(self.to_scr(Point::new(img_w, img_h)));

        for i in 1..STEPS {
            let t = i as f64 / STEPS as f64;
            visit(self.to_scr(Point::new(img_w * t, 0.0)));
            visit(self.to_scr(Point::new(img_w * t, img_h)));
            visit(self.to_scr(Point::new(0.0, img_h * t)));
            visit(self.to_scr(Point::new(img_w, img_h * t)));
        }

        let scr_xshift = (-minx - 1.0) as i64;
        let scr_yshift = (-miny - 1.0) as i64;
        let scr_width = (maxx - minx + 2.0) as i64;
        let scr_height = (maxy - miny + 2.0) as i64;
        (scr_xshift, scr_yshift, scr_width, scr_height)
    }

    /// Local image-space pixel size of one screen-lattice unit at `scr`,
    /// via central finite differences — used to decide oversampling when
    /// rendering or detecting patches.
    pub fn pixel_size(&self, scr: Point) -> f64 {
        const H: f64 = 1e-3;
        let dx = self.to_img(Point::new(scr.x + H, scr.y)) - self.to_img(Point::new(scr.x - H, scr.y));
        let dy = self.to_img(Point::new(scr.x, scr.y + H)) - self.to_img(Point::new(scr.x, scr.y - H));
        ((dx.length() / (2.0 * H)) + (dy.length() / (2.0 * H))) * 0.5
    }

    /// Ratio between the red/green/blue patch areas expected at `scr`
    /// under the current transform and their nominal screen-space areas,
    /// used by the detector to judge whether a candidate patch's size is
    /// plausible for its assumed color class.
    pub fn patch_proportions(&self, scr: Point, nominal_area: f64, _class: ColorClass) -> f64 {
        let local_scale = self.pixel_size(scr);
        (local_scale * local_scale) / nominal_area.max(1e-12)
    }
}

fn rotate_scale(p: Point, angle: f64, ratio: f64) -> Point {
    let (s, c) = angle.sin_cos();
    Point::new((p.x * c - p.y * s) * ratio, (p.x * s + p.y * c) * ratio)
}

fn apply_motor(
    p: Point,
    scanner: ScannerType,
    f: &PrecomputedFunction,
    forward: bool,
) -> Point {
    match scanner {
        ScannerType::LensMovesX => {
            let x = if forward { f.apply(p.x) } else { f.invert(p.x) };
            Point::new(x, p.y)
        }
        ScannerType::LensMovesY => {
            let y = if forward { f.apply(p.y) } else { f.invert(p.y) };
            Point::new(p.x, y)
        }
        ScannerType::FixedLens => p,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affine_round_trip_without_extras() {
        let params = ScrToImgParams {
            origin: Point::new(100.0, 50.0),
            basis_x: Point::new(20.0, 1.0),
            basis_y: Point::new(-1.0, 18.0),
            ..Default::default()
        };
        let map = ScrToImg::new(params);
        let scr = Point::new(3.5, -2.0);
        let img = map.to_img(scr);
        let back = map.to_scr(img);
        assert!(back.almost_eq(scr, 1e-6));
    }

    #[test]
    fn perspective_round_trip_converges() {
        let params = ScrToImgParams {
            origin: Point::new(0.0, 0.0),
            basis_x: Point::new(10.0, 0.0),
            basis_y: Point::new(0.0, 10.0),
            perspective: (0.0005, 0.0003),
            ..Default::default()
        };
        let map = ScrToImg::new(params);
        let scr = Point::new(4.0, 6.0);
        let img = map.to_img(scr);
        let back = map.to_scr(img);
        assert!(back.almost_eq(scr, 1e-2));
    }

    #[test]
    fn get_range_covers_the_image_footprint_in_screen_space() {
        let map = ScrToImg::new(ScrToImgParams::default());
        let (xshift, yshift, width, height) = map.get_range(10.0, 5.0);
        // Identity basis: image space is screen space, so the footprint is
        // the image rectangle itself, padded by the +-1 the original keeps
        // against rounding at the edges.
        assert_eq!(xshift, -1);
        assert_eq!(yshift, -1);
        assert_eq!(width, 12);
        assert_eq!(height, 7);
    }
}
