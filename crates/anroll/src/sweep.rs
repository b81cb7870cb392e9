//! Grid sweep of the distortion totals over IF, shape factor and radius
//! scale.

use serde::{Deserialize, Serialize};

use crate::blend::{BlendCurve, ShapeBounds};
use crate::contour::ContourModel;
use crate::distortion::DistortionEstimator;
use crate::mapping::{compute_shape_bounds, Mapper, MappingParams};
use crate::params::Parameters;

/// Evenly spaced values `lo..=hi`.
///
/// A degenerate axis (`lo == hi` or fewer than two steps) yields `lo` once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub lo: f64,
    pub hi: f64,
    pub steps: usize,
}

impl SweepAxis {
    pub fn new(lo: f64, hi: f64, steps: usize) -> Self {
        Self { lo, hi, steps }
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(value, value, 1)
    }

    pub fn is_fixed(&self) -> bool {
        self.lo == self.hi || self.steps < 2
    }

    pub fn values(&self) -> Vec<f64> {
        if self.is_fixed() {
            return vec![self.lo];
        }
        (0..self.steps)
            .map(|i| self.lo + (self.hi - self.lo) * i as f64 / (self.steps - 1) as f64)
            .collect()
    }
}

/// Per-metric error totals of one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub interpolation_target: f64,
    pub shape_factor: f64,
    /// Blend offset `d` actually used.
    pub blend_offset: f64,
    pub radius_scale: f64,
    /// `[horizontal, vertical, relative, angular]` sums over the grid.
    pub totals: [f64; 4],
}

impl SweepRow {
    /// `if;d;radius;h;v;r;a`.
    pub fn to_line(&self) -> String {
        format!(
            "{};{};{};{};{};{};{}",
            self.interpolation_target,
            self.blend_offset,
            self.radius_scale,
            self.totals[0],
            self.totals[1],
            self.totals[2],
            self.totals[3]
        )
    }
}

/// Sweep settings that stay fixed across configurations.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SweepGrid {
    pub side: usize,
    pub jitter: f64,
    pub bound_samples: usize,
}

/// Evaluate every configuration of the three axes in IF → shape → radius
/// order.
///
/// A fixed shape axis flattens the blend curve (`d = IF`). Shape steps
/// that land on the same blend offset as their predecessor are skipped.
pub(crate) fn run(
    contour: &ContourModel,
    params: &Parameters,
    axes: [SweepAxis; 3],
    grid: SweepGrid,
) -> Vec<SweepRow> {
    let [if_axis, shape_axis, radius_axis] = axes;
    let mut rows = Vec::new();
    let mut blend = BlendCurve::new(params.interpolation_target, params.shape_factor);
    let mut mapping = MappingParams::from(params);

    for target in if_axis.values() {
        blend.set_interpolation_target(target);
        let bounds = if shape_axis.is_fixed() {
            ShapeBounds::UNBOUNDED
        } else {
            compute_shape_bounds(contour, target, params.restrict_shape, grid.bound_samples)
        };
        blend.set_bounds(bounds);

        let mut previous = None;
        for factor in shape_axis.values() {
            blend.set_shape_factor(factor);
            let (_, offset) = blend.coefficients();
            if previous == Some(offset) {
                continue;
            }
            previous = Some(offset);

            for radius_scale in radius_axis.values() {
                mapping.radius_scale = radius_scale;
                let mapper = Mapper::new(contour, &blend, mapping);
                let totals = DistortionEstimator::new(mapper)
                    .evaluate(grid.side, grid.side, grid.jitter)
                    .metric_totals();
                tracing::trace!(target, offset, radius_scale, ?totals, "sweep point");
                rows.push(SweepRow {
                    interpolation_target: target,
                    shape_factor: factor,
                    blend_offset: offset,
                    radius_scale,
                    totals,
                });
            }
        }
    }
    rows
}
