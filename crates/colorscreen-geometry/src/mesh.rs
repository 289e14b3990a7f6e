use colorscreen_core::Point;

/// A dense curvilinear grid mapping a rectangular `(grid_w x grid_h)`
/// lattice of control points in source space to displaced points in
/// target space. `apply` bilinearly interpolates within the cell
/// containing a query point; `invert` runs Newton's method against the
/// (numerically differentiated) forward map, since a bilinear patch is
/// not analytically invertible in closed form.
#[derive(Debug, Clone)]
pub struct Mesh {
    grid_w: usize,
    grid_h: usize,
    origin: Point,
    cell_size: Point,
    /// Target-space position of each control point, row-major.
    targets: Vec<Point>,
}

impl Mesh {
    pub fn new(
        grid_w: usize,
        grid_h: usize,
        origin: Point,
        cell_size: Point,
        targets: Vec<Point>,
    ) -> Self {
        assert_eq!(targets.len(), grid_w * grid_h);
        Mesh {
            grid_w,
            grid_h,
            origin,
            cell_size,
            targets,
        }
    }

    fn grid_coords(&self, p: Point) -> (f64, f64) {
        (
            (p.x - self.origin.x) / self.cell_size.x,
            (p.y - self.origin.y) / self.cell_size.y,
        )
    }

    fn target_at(&self, gx: usize, gy: usize) -> Point {
        let gx = gx.min(self.grid_w - 1);
        let gy = gy.min(self.grid_h - 1);
        self.targets[gy * self.grid_w + gx]
    }

    /// Maps a source-space point to target space via bilinear
    /// interpolation of the surrounding four control points. Points
    /// outside the grid are clamped to the nearest edge cell.
    pub fn apply(&self, p: Point) -> Point {
        let (gx, gy) = self.grid_coords(p);
        let gx = gx.clamp(0.0, (self.grid_w - 1) as f64);
        let gy = gy.clamp(0.0, (self.grid_h - 1) as f64);
        let x0 = gx.floor() as usize;
        let y0 = gy.floor() as usize;
        let tx = gx - x0 as f64;
        let ty = gy - y0 as f64;

        let p00 = self.target_at(x0, y0);
        let p10 = self.target_at(x0 + 1, y0);
        let p01 = self.target_at(x0, y0 + 1);
        let p11 = self.target_at(x0 + 1, y0 + 1);

        let top = p00 * (1.0 - tx) + p10 * tx;
        let bottom = p01 * (1.0 - tx) + p11 * tx;
        top * (1.0 - ty) + bottom * ty
    }

    /// Finds the source-space point mapping to `target` via Newton
    /// iteration with a numerically differentiated Jacobian, starting
    /// from `target` itself (a reasonable guess since the mesh models a
    /// small deviation from identity).
    pub fn invert(&self, target: Point) -> Point {
        let mut guess = target;
        let h = self.cell_size.x.min(self.cell_size.y) * 1e-3;
        const MAX_ITER: usize = 50;
        const EPS: f64 = 1e-6;

        for _ in 0..MAX_ITER {
            let f = self.apply(guess) - target;
            if f.length() < EPS {
                break;
            }
            let fx = (self.apply(Point::new(guess.x + h, guess.y)) - self.apply(guess)) * (1.0 / h);
            let fy = (self.apply(Point::new(guess.x, guess.y + h)) - self.apply(guess)) * (1.0 / h);

            // Solve the 2x2 system [fx fy] * delta = -f.
            let det = fx.x * fy.y - fx.y * fy.x;
            if det.abs() < 1e-12 {
                break;
            }
            let dx = (-f.x * fy.y + f.y * fy.x) / det;
            let dy = (fx.x * -f.y + fx.y * f.x) / det;
            guess = Point::new(guess.x + dx, guess.y + dy);
        }
        guess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A mesh whose targets are the identity map plus a small uniform
    /// shift, so `apply`/`invert` correctness is easy to check exactly.
    fn shifted_mesh() -> Mesh {
        let grid_w = 4;
        let grid_h = 4;
        let mut targets = Vec::with_capacity(grid_w * grid_h);
        for gy in 0..grid_h {
            for gx in 0..grid_w {
                targets.push(Point::new(gx as f64 * 10.0 + 1.0, gy as f64 * 10.0 - 2.0));
            }
        }
        Mesh::new(
            grid_w,
            grid_h,
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            targets,
        )
    }

    #[test]
    fn apply_reproduces_uniform_shift() {
        let mesh = shifted_mesh();
        let p = mesh.apply(Point::new(15.0, 5.0));
        assert!((p.x - 16.0).abs() < 1e-9);
        assert!((p.y - 3.0).abs() < 1e-9);
    }

    #[test]
    fn invert_is_the_inverse_of_apply() {
        let mesh = shifted_mesh();
        let src = Point::new(12.0, 22.0);
        let target = mesh.apply(src);
        let back = mesh.invert(target);
        assert!(back.almost_eq(src, 1e-3));
    }
}
