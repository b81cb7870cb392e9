//! Destination → source polar transform.
//!
//! Canonical destination coordinates are `x ∈ [-1, 1]` across the unrolled
//! width and `y ∈ [0, 1]` from the top to the bottom of the crop window.
//! Each row is a circle arc in the developed plane; the row radius mixes the
//! contour radius with its linear approximation and the horizontal position
//! along the arc comes from the blend curve integral.

mod render;
mod table;

pub use render::{render_grid, render_image, triangulate, LineData, RenderData, GRID_SUBDIVISIONS};
pub use table::{JitteredTable, MappingTable};

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::blend::{BlendCurve, ShapeBounds};
use crate::contour::ContourModel;
use crate::params::Parameters;
use crate::quadrature::integrate_adaptive;

/// Absolute tolerance of the isotropy quadrature.
const ISOTROPY_TOLERANCE: f64 = 1e-10;

/// Parameter subset the transform reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappingParams {
    /// Multiplier applied to the blended row radius.
    pub radius_scale: f64,
    /// `0` keeps rows curved, `1` flattens them to straight lines.
    pub tilt: f64,
    /// Fraction cropped from the left of the unrolled width.
    pub crop_left: f64,
    /// Fraction cropped from the right of the unrolled width.
    pub crop_right: f64,
    /// Re-place rows so vertical spacing matches horizontal scale.
    pub enforce_isotropy: bool,
    /// Space rows uniformly in arc length rather than in height.
    pub arc_length_uniform: bool,
}

impl From<&Parameters> for MappingParams {
    fn from(p: &Parameters) -> Self {
        Self {
            radius_scale: p.radius_scale,
            tilt: p.tilt,
            crop_left: p.crop_left,
            crop_right: p.crop_right,
            enforce_isotropy: p.enforce_isotropy,
            arc_length_uniform: p.arc_length_uniform,
        }
    }
}

/// Per-row quantities of the transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowSample {
    /// Arc length of the row on the contour.
    pub arc: f64,
    /// Arc length used to place the circle center (isotropy corrected).
    pub placed_arc: f64,
    /// Spline radius at `arc`.
    pub radius: f64,
    /// Linear-approximation radius at `arc`.
    pub linear_radius: f64,
}

impl RowSample {
    /// `linear + (radius - linear) * t`.
    pub fn radius_at(&self, t: f64) -> f64 {
        self.linear_radius + (self.radius - self.linear_radius) * t
    }
}

/// Row-independent constants of the polar projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Projection {
    pub interpolation_target: f64,
    pub radius_scale: f64,
    pub tilt: f64,
    pub total_arc: f64,
}

impl Projection {
    /// Project column `x` of `row`; `integral` is the blend integral over
    /// `[0, |x|]`.
    pub fn apply(&self, row: &RowSample, x: f64, integral: f64) -> [f64; 2] {
        let arc_offset = if x != 0.0 {
            let circumference = row.radius_at(integral / x.abs()) * TAU;
            circumference / 2.0 * x
        } else {
            0.0
        };
        let r = row.radius_at(self.interpolation_target) * self.radius_scale;
        let cy = self.total_arc - row.placed_arc + r;
        let phi = arc_offset / r;
        let px = r * phi.sin();
        let py = cy - r * phi.cos();
        let flat = cy - r;
        [px, py + (flat - py) * self.tilt]
    }
}

/// Borrowing view that evaluates the transform for one parameter state.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    contour: &'a ContourModel,
    blend: &'a BlendCurve,
    params: MappingParams,
}

impl<'a> Mapper<'a> {
    pub fn new(contour: &'a ContourModel, blend: &'a BlendCurve, params: MappingParams) -> Self {
        Self {
            contour,
            blend,
            params,
        }
    }

    pub fn contour(&self) -> &'a ContourModel {
        self.contour
    }

    pub fn blend(&self) -> &'a BlendCurve {
        self.blend
    }

    pub fn params(&self) -> &MappingParams {
        &self.params
    }

    pub(crate) fn projection(&self) -> Projection {
        Projection {
            interpolation_target: self.blend.interpolation_target(),
            radius_scale: self.params.radius_scale,
            tilt: self.params.tilt,
            total_arc: self.contour.arc_length(),
        }
    }

    /// Canonical `x` of a column at fraction `t` of the cropped width.
    pub fn column_x(&self, t: f64) -> f64 {
        let left = self.params.crop_left;
        let right = 1.0 - self.params.crop_right;
        (left + (right - left) * t - 0.5) * 2.0
    }

    /// Row quantities at normalized height `y`.
    pub fn row(&self, y: f64) -> RowSample {
        let arc = if self.params.arc_length_uniform {
            self.contour.arc_bounds().interp(y)
        } else {
            self.contour
                .arc_at_height(self.contour.height_bounds().interp(y))
        };
        self.row_at_arc(arc)
    }

    /// Row quantities at an explicit contour arc length.
    pub fn row_at_arc(&self, arc: f64) -> RowSample {
        let placed_arc = if self.params.enforce_isotropy {
            self.isotropic_arc(arc)
        } else {
            arc
        };
        RowSample {
            arc,
            placed_arc,
            radius: self.contour.radius_at_arc(arc),
            linear_radius: self.contour.linear_radius_at_arc(arc),
        }
    }

    /// Arc length re-measured with the horizontal scale of the blended
    /// center column.
    pub fn isotropic_arc(&self, arc: f64) -> f64 {
        let d = self.blend.evaluate(0.0);
        let contour = self.contour;
        let origin = contour.arc_origin();
        let stretch = |s: f64| {
            let radius = contour.radius_at_arc(s);
            let linear = contour.linear_radius_at_arc(s);
            (linear + (radius - linear) * d) / radius
        };
        origin + integrate_adaptive(stretch, origin, arc, ISOTROPY_TOLERANCE)
    }

    /// Source-plane position of canonical `(x, y)`.
    pub fn map_point(&self, x: f64, y: f64) -> [f64; 2] {
        let row = self.row(y);
        self.projection()
            .apply(&row, x, self.blend.integrate(0.0, x.abs()))
    }
}

/// Admissible interval for the blend offset over the cropped height.
///
/// Each of `samples` rows contributes `[min(b0, b1), max(b0, b1)]` with
/// `b0 = -L / (R - L)` and `b1 = 3 IF / 2 + L / (2 (R - L))`; `restrict`
/// further clamps each row to `[max(0, (3 IF - 1) / 2), min(1, 3 IF / 2)]`.
/// The result is the intersection over all rows. Rows that yield NaN limits
/// do not tighten the result.
pub fn compute_shape_bounds(
    contour: &ContourModel,
    interpolation_target: f64,
    restrict: bool,
    samples: usize,
) -> ShapeBounds {
    let samples = samples.max(2);
    let target = interpolation_target;
    let restrict_lo = ((3.0 * target - 1.0) / 2.0).max(0.0);
    let restrict_hi = (1.5 * target).min(1.0);

    let mut bounds = ShapeBounds::UNBOUNDED;
    for i in 0..samples {
        let y = i as f64 / (samples - 1) as f64;
        let arc = contour.arc_at_height(contour.height_bounds().interp(y));
        let linear = contour.linear_radius_at_arc(arc);
        let radius = contour.radius_at_arc(arc);
        let gap = radius - linear;

        let b0 = -linear / gap;
        let b1 = 1.5 * target + linear / (2.0 * gap);
        let (mut lo, mut hi) = if b0 <= b1 { (b0, b1) } else { (b1, b0) };
        if restrict {
            lo = lo.max(restrict_lo);
            hi = hi.min(restrict_hi);
        }
        bounds = bounds.intersect(lo, hi);
    }

    if bounds.min > bounds.max {
        tracing::debug!(
            min = bounds.min,
            max = bounds.max,
            "shape bounds intersection is empty"
        );
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{cone_samples, vase_samples};
    use approx::assert_abs_diff_eq;

    fn params() -> MappingParams {
        MappingParams::from(&Parameters::default())
    }

    #[test]
    fn map_point_is_mirror_symmetric() {
        let contour = ContourModel::fit(&vase_samples(60, 200.0), 1e-6).unwrap();
        let mut blend = BlendCurve::new(0.4, 0.6);
        blend.set_bounds(compute_shape_bounds(&contour, 0.4, true, 64));
        let mapper = Mapper::new(&contour, &blend, params());
        for &y in &[0.0, 0.3, 0.77, 1.0] {
            for &x in &[0.1, 0.5, 0.93] {
                let p = mapper.map_point(x, y);
                let q = mapper.map_point(-x, y);
                assert_abs_diff_eq!(p[0], -q[0], epsilon = 1e-9);
                assert_abs_diff_eq!(p[1], q[1], epsilon = 1e-9);
            }
            let c = mapper.map_point(0.0, y);
            assert_eq!(c[0], 0.0);
        }
    }

    #[test]
    fn full_tilt_flattens_rows() {
        let contour = ContourModel::fit(&vase_samples(60, 200.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mut p = params();
        p.tilt = 1.0;
        let mapper = Mapper::new(&contour, &blend, p);
        let y_center = mapper.map_point(0.0, 0.4)[1];
        for &x in &[-0.9, -0.2, 0.6] {
            assert_abs_diff_eq!(mapper.map_point(x, 0.4)[1], y_center, epsilon = 1e-9);
        }
    }

    #[test]
    fn center_column_steps_down_by_arc_length() {
        let contour = ContourModel::fit(&cone_samples(40, 50.0, 0.5, 200.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mapper = Mapper::new(&contour, &blend, params());
        let top = mapper.map_point(0.0, 0.0);
        let bottom = mapper.map_point(0.0, 1.0);
        assert_abs_diff_eq!(top[1] - bottom[1], contour.arc_length(), epsilon = 1e-6);
        assert_abs_diff_eq!(bottom[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn cylinder_row_wraps_half_circumference_each_side() {
        let contour = ContourModel::fit(&cone_samples(20, 40.0, 0.0, 100.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mut p = params();
        p.radius_scale = 1e6;
        let mapper = Mapper::new(&contour, &blend, p);
        let right = mapper.map_point(1.0, 0.5);
        let left = mapper.map_point(-1.0, 0.5);
        assert_abs_diff_eq!(right[0] - left[0], TAU * 40.0, epsilon = 1e-3);
    }

    #[test]
    fn isotropy_is_identity_on_a_cylinder() {
        let contour = ContourModel::fit(&cone_samples(20, 40.0, 0.0, 100.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mut p = params();
        p.enforce_isotropy = true;
        let mapper = Mapper::new(&contour, &blend, p);
        assert_abs_diff_eq!(mapper.isotropic_arc(63.0), 63.0, epsilon = 1e-8);
    }

    #[test]
    fn isotropy_with_uniform_arc_rows_stays_ordered() {
        let contour = ContourModel::fit(&vase_samples(60, 200.0), 1e-6).unwrap();
        let mut blend = BlendCurve::new(0.5, 0.5);
        blend.set_bounds(compute_shape_bounds(&contour, 0.5, true, 128));
        let mut p = params();
        p.enforce_isotropy = true;
        p.arc_length_uniform = true;
        let mapper = Mapper::new(&contour, &blend, p);
        let mut prev = f64::INFINITY;
        for i in 0..=20 {
            let q = mapper.map_point(0.0, i as f64 / 20.0);
            assert!(q[0].is_finite() && q[1].is_finite());
            assert!(q[1] < prev);
            prev = q[1];
        }
    }

    #[test]
    fn restricted_shape_bounds_are_nested() {
        let contour = ContourModel::fit(&vase_samples(60, 200.0), 1e-6).unwrap();
        for target in [0.2, 0.5, 0.8] {
            let free = compute_shape_bounds(&contour, target, false, 200);
            let tight = compute_shape_bounds(&contour, target, true, 200);
            assert!(tight.min >= free.min);
            assert!(tight.max <= free.max);
            assert!(tight.min >= 0.0 && tight.max <= 1.0);
        }
    }

    #[test]
    fn straight_profile_leaves_bounds_unconstrained_by_rows() {
        let contour = ContourModel::fit(&cone_samples(40, 50.0, 0.0, 200.0), 1e-6).unwrap();
        let b = compute_shape_bounds(&contour, 0.5, true, 32);
        assert_abs_diff_eq!(b.min, 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(b.max, 0.75, epsilon = 1e-12);
    }
}
