use super::{Mapper, Projection, RowSample};
use crate::contour::ContourModel;

fn fraction(i: usize, n: usize) -> f64 {
    if n > 1 {
        i as f64 / (n - 1) as f64
    } else {
        0.0
    }
}

/// Precomputed per-column and per-row quantities for a `width × height`
/// destination grid.
///
/// Records the contour generation it was built from; a refit or crop change
/// makes the table stale.
#[derive(Debug, Clone)]
pub struct MappingTable {
    width: usize,
    height: usize,
    generation: u64,
    xs: Vec<f64>,
    integrals: Vec<f64>,
    rows: Vec<RowSample>,
    projection: Projection,
}

impl MappingTable {
    pub fn build(mapper: &Mapper<'_>, width: usize, height: usize) -> Self {
        let blend = mapper.blend();
        let xs: Vec<f64> = (0..width)
            .map(|i| mapper.column_x(fraction(i, width)))
            .collect();
        let integrals = xs.iter().map(|x| blend.integrate(0.0, x.abs())).collect();
        let rows = (0..height).map(|j| mapper.row(fraction(j, height))).collect();
        Self {
            width,
            height,
            generation: mapper.contour().generation(),
            xs,
            integrals,
            rows,
            projection: mapper.projection(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[RowSample] {
        &self.rows
    }

    pub fn columns(&self) -> &[f64] {
        &self.xs
    }

    /// Whether the table still matches `contour`.
    pub fn is_current(&self, contour: &ContourModel) -> bool {
        self.generation == contour.generation()
    }

    pub fn point(&self, col: usize, row: usize) -> [f64; 2] {
        self.projection
            .apply(&self.rows[row], self.xs[col], self.integrals[col])
    }

    /// All mapped points in row-major order as `f32` coordinate arrays.
    pub fn points(&self) -> (Vec<f32>, Vec<f32>) {
        let n = self.width * self.height;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        for row in 0..self.height {
            for col in 0..self.width {
                let [x, y] = self.point(col, row);
                xs.push(x as f32);
                ys.push(y as f32);
            }
        }
        (xs, ys)
    }
}

/// Mapping table paired with a jittered copy for finite differences.
///
/// The jittered column moves `x` by `jitter` toward the center line (or
/// rightwards at `x <= 0`); the jittered row moves the arc length by
/// `jitter` times the total arc length. Rows always follow the height
/// spline.
#[derive(Debug, Clone)]
pub struct JitteredTable {
    width: usize,
    height: usize,
    jitter: f64,
    xs: Vec<[f64; 2]>,
    integrals: Vec<[f64; 2]>,
    rows: Vec<[RowSample; 2]>,
    projection: Projection,
}

impl JitteredTable {
    pub fn build(mapper: &Mapper<'_>, width: usize, height: usize, jitter: f64) -> Self {
        let blend = mapper.blend();
        let contour = mapper.contour();
        let arc_step = jitter * contour.arc_length();

        let xs: Vec<[f64; 2]> = (0..width)
            .map(|i| {
                let x = mapper.column_x(fraction(i, width));
                let shifted = if x <= 0.0 { x + jitter } else { x - jitter };
                [x, shifted]
            })
            .collect();
        let integrals = xs
            .iter()
            .map(|[x, xj]| [blend.integrate(0.0, x.abs()), blend.integrate(0.0, xj.abs())])
            .collect();
        let rows = (0..height)
            .map(|j| {
                let height_at = contour.height_bounds().interp(fraction(j, height));
                let arc = contour.arc_at_height(height_at);
                [mapper.row_at_arc(arc), mapper.row_at_arc(arc + arc_step)]
            })
            .collect();

        Self {
            width,
            height,
            jitter,
            xs,
            integrals,
            rows,
            projection: mapper.projection(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Spline radius of the unjittered row.
    pub fn row_radius(&self, row: usize) -> f64 {
        self.rows[row][0].radius
    }

    /// Total contour arc length the vertical jitter is scaled by.
    pub fn total_arc(&self) -> f64 {
        self.projection.total_arc
    }

    /// `[center, horizontal neighbour, vertical neighbour]`.
    pub fn stencil(&self, col: usize, row: usize) -> [[f64; 2]; 3] {
        let [x, xj] = self.xs[col];
        let [ix, ixj] = self.integrals[col];
        let [r, rj] = &self.rows[row];
        [
            self.projection.apply(r, x, ix),
            self.projection.apply(r, xj, ixj),
            self.projection.apply(rj, x, ix),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendCurve;
    use crate::mapping::{compute_shape_bounds, MappingParams};
    use crate::params::Parameters;
    use crate::test_utils::vase_samples;
    use approx::assert_abs_diff_eq;

    #[test]
    fn table_matches_direct_mapping() {
        let mut contour = ContourModel::fit(&vase_samples(60, 200.0), 1e-6).unwrap();
        contour.set_crop(0.1, 0.05);
        contour.refit_linear_approximation();
        let mut blend = BlendCurve::new(0.45, 0.3);
        blend.set_bounds(compute_shape_bounds(&contour, 0.45, true, 64));
        let mut p = MappingParams::from(&Parameters::default());
        p.crop_left = 0.1;
        p.crop_right = 0.2;
        p.tilt = 0.25;
        let mapper = Mapper::new(&contour, &blend, p);

        let table = MappingTable::build(&mapper, 9, 7);
        assert!(table.is_current(&contour));
        for row in 0..7 {
            for col in 0..9 {
                let x = mapper.column_x(col as f64 / 8.0);
                let expected = mapper.map_point(x, row as f64 / 6.0);
                let got = table.point(col, row);
                assert_abs_diff_eq!(got[0], expected[0], epsilon = 1e-9);
                assert_abs_diff_eq!(got[1], expected[1], epsilon = 1e-9);
            }
        }
        let (xs, ys) = table.points();
        assert_eq!(xs.len(), 63);
        assert_eq!(ys.len(), 63);
    }

    #[test]
    fn crop_change_makes_table_stale() {
        let mut contour = ContourModel::fit(&vase_samples(30, 100.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let table = {
            let mapper = Mapper::new(&contour, &blend, MappingParams::from(&Parameters::default()));
            MappingTable::build(&mapper, 4, 4)
        };
        contour.crop_top(0.2);
        assert!(!table.is_current(&contour));
    }

    #[test]
    fn jitter_moves_toward_interior() {
        let contour = ContourModel::fit(&vase_samples(30, 100.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mapper = Mapper::new(&contour, &blend, MappingParams::from(&Parameters::default()));
        let table = JitteredTable::build(&mapper, 5, 3, 0.001);
        let expected = [(0, -1.0, -0.999), (2, 0.0, 0.001), (4, 1.0, 0.999)];
        for (col, x, shifted) in expected {
            assert_abs_diff_eq!(table.xs[col][0], x, epsilon = 1e-12);
            assert_abs_diff_eq!(table.xs[col][1], shifted, epsilon = 1e-12);
        }
        let step = table.rows[1][1].arc - table.rows[1][0].arc;
        assert_abs_diff_eq!(step, 0.001 * contour.arc_length(), epsilon = 1e-9);
    }
}
