//! Local distortion metrics of the unrolling transform.
//!
//! Every grid point is mapped together with a horizontal and a vertical
//! neighbour displaced by a small jitter. The mapped distances, compared
//! with the distances the same displacement covers on the physical surface,
//! give four ratios per point (1 means undistorted):
//!
//! - horizontal: mapped width vs. circumference share at the row radius;
//! - vertical: mapped height vs. arc-length share;
//! - relative: horizontal over vertical;
//! - angular: angle between the two mapped directions, 1 at a right angle.
//!
//! A ratio becomes an error metric as `clamp(ratio - 1, -1, 1)²`.

mod color;

pub use color::error_color;

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

use crate::mapping::{triangulate, JitteredTable, Mapper, RenderData};

/// Default finite-difference displacement in canonical units.
pub const DEFAULT_JITTER: f64 = 0.001;

/// Relative weights of the four metrics in the combined error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorWeights {
    pub horizontal: f64,
    pub vertical: f64,
    pub relative: f64,
    pub angular: f64,
}

impl Default for ErrorWeights {
    fn default() -> Self {
        Self {
            horizontal: 1.0,
            vertical: 1.0,
            relative: 1.0,
            angular: 1.0,
        }
    }
}

impl ErrorWeights {
    pub fn as_array(&self) -> [f64; 4] {
        [self.horizontal, self.vertical, self.relative, self.angular]
    }

    /// Weights scaled to sum to one, `None` when they sum to zero.
    pub fn normalized(&self) -> Option<[f64; 4]> {
        let w = self.as_array();
        let total: f64 = w.iter().sum();
        if total == 0.0 {
            return None;
        }
        Some(w.map(|v| v / total))
    }
}

/// Which metric a rendered error map shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Horizontal,
    Vertical,
    /// Even mix of the horizontal and vertical colours.
    Combined,
    Relative,
    Angular,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::Horizontal,
        ErrorKind::Vertical,
        ErrorKind::Combined,
        ErrorKind::Relative,
        ErrorKind::Angular,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Combined => "combined",
            Self::Relative => "relative",
            Self::Angular => "angular",
        }
    }
}

/// Raw distortion ratios at one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DistortionSample {
    pub horizontal: f64,
    pub vertical: f64,
    pub relative: f64,
    pub angular: f64,
}

impl DistortionSample {
    /// `clamp(ratio - 1, -1, 1)²`.
    pub fn metric(ratio: f64) -> f64 {
        (ratio - 1.0).clamp(-1.0, 1.0).powi(2)
    }

    /// Metrics in `[horizontal, vertical, relative, angular]` order.
    pub fn metrics(&self) -> [f64; 4] {
        [self.horizontal, self.vertical, self.relative, self.angular].map(Self::metric)
    }

    pub fn color(&self, kind: ErrorKind) -> [f32; 3] {
        match kind {
            ErrorKind::Horizontal => error_color(self.horizontal),
            ErrorKind::Vertical => error_color(self.vertical),
            ErrorKind::Relative => error_color(self.relative),
            ErrorKind::Angular => error_color(self.angular),
            ErrorKind::Combined => {
                let (h, v) = (error_color(self.horizontal), error_color(self.vertical));
                [0.5 * (h[0] + v[0]), 0.5 * (h[1] + v[1]), 0.5 * (h[2] + v[2])]
            }
        }
    }
}

/// Normalized vector, zero for a zero-length input.
fn unit(v: [f64; 2]) -> [f64; 2] {
    let n = v[0].hypot(v[1]);
    if n > 0.0 {
        [v[0] / n, v[1] / n]
    } else {
        [0.0, 0.0]
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Distortion ratios on a `width × height` grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistortionMap {
    width: usize,
    height: usize,
    jitter: f64,
    x: Vec<f32>,
    y: Vec<f32>,
    samples: Vec<DistortionSample>,
}

impl DistortionMap {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[DistortionSample] {
        &self.samples
    }

    /// Weighted sum of the four metrics at `index` with normalized weights.
    /// Weights summing to zero give zero.
    pub fn weighted_error(&self, index: usize, weights: &ErrorWeights) -> f64 {
        match weights.normalized() {
            Some(w) => weighted(&self.samples[index], &w),
            None => 0.0,
        }
    }

    /// [`DistortionMap::weighted_error`] summed over every point.
    pub fn total_weighted_error(&self, weights: &ErrorWeights) -> f64 {
        match weights.normalized() {
            Some(w) => self.samples.iter().map(|s| weighted(s, &w)).sum(),
            None => 0.0,
        }
    }

    /// Per-metric sums over every point.
    pub fn metric_totals(&self) -> [f64; 4] {
        let mut totals = [0.0; 4];
        for s in &self.samples {
            for (t, m) in totals.iter_mut().zip(s.metrics()) {
                *t += m;
            }
        }
        totals
    }

    /// Coloured mesh for one metric.
    pub fn render_data(&self, kind: ErrorKind) -> RenderData {
        RenderData {
            width: self.width,
            height: self.height,
            x: self.x.clone(),
            y: self.y.clone(),
            colors: self
                .samples
                .iter()
                .map(|s| {
                    let [r, g, b] = s.color(kind);
                    [r, g, b, 1.0]
                })
                .collect(),
            triangles: triangulate(self.width, self.height),
        }
    }
}

fn weighted(sample: &DistortionSample, w: &[f64; 4]) -> f64 {
    sample
        .metrics()
        .iter()
        .zip(w.iter())
        .map(|(m, w)| m * w)
        .sum()
}

/// Evaluates distortion for one mapping state.
#[derive(Debug, Clone, Copy)]
pub struct DistortionEstimator<'a> {
    mapper: Mapper<'a>,
}

impl<'a> DistortionEstimator<'a> {
    pub fn new(mapper: Mapper<'a>) -> Self {
        Self { mapper }
    }

    /// Build the jittered tables and compute ratios at every grid point.
    pub fn evaluate(&self, width: usize, height: usize, jitter: f64) -> DistortionMap {
        let table = JitteredTable::build(&self.mapper, width, height, jitter);
        let total_arc = table.total_arc();
        let n = width * height;
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut samples = Vec::with_capacity(n);

        for row in 0..height {
            let circumference = table.row_radius(row) * TAU;
            for col in 0..width {
                let [center, side, below] = table.stencil(col, row);
                x.push(center[0] as f32);
                y.push(center[1] as f32);

                let horizontal = (distance(center, side) * 2.0 / jitter) / circumference;
                let vertical = (distance(center, below) / jitter) / total_arc;

                let down = unit([below[0] - center[0], below[1] - center[1]]);
                let across = unit([side[0] - center[0], side[1] - center[1]]);
                let angle = (down[0] * across[0] + down[1] * across[1]).acos();

                samples.push(DistortionSample {
                    horizontal,
                    vertical,
                    relative: horizontal / vertical,
                    angular: 1.0 + (angle - FRAC_PI_2) / FRAC_PI_2,
                });
            }
        }

        DistortionMap {
            width,
            height,
            jitter,
            x,
            y,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendCurve;
    use crate::contour::ContourModel;
    use crate::mapping::{compute_shape_bounds, MappingParams};
    use crate::params::Parameters;
    use crate::test_utils::{cone_samples, vase_samples};
    use approx::assert_abs_diff_eq;

    fn sample(h: f64, v: f64, r: f64, a: f64) -> DistortionSample {
        DistortionSample {
            horizontal: h,
            vertical: v,
            relative: r,
            angular: a,
        }
    }

    fn map_of(samples: Vec<DistortionSample>) -> DistortionMap {
        DistortionMap {
            width: samples.len(),
            height: 1,
            jitter: DEFAULT_JITTER,
            x: vec![0.0; samples.len()],
            y: vec![0.0; samples.len()],
            samples,
        }
    }

    #[test]
    fn metric_clamps_then_squares() {
        assert_eq!(DistortionSample::metric(1.0), 0.0);
        assert_abs_diff_eq!(DistortionSample::metric(1.5), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(DistortionSample::metric(0.5), 0.25, epsilon = 1e-12);
        assert_eq!(DistortionSample::metric(7.0), 1.0);
        assert_eq!(DistortionSample::metric(-3.0), 1.0);
    }

    #[test]
    fn weights_are_normalized() {
        let map = map_of(vec![sample(1.5, 1.0, 2.0, 1.0)]);
        let w = ErrorWeights {
            horizontal: 2.0,
            vertical: 0.0,
            relative: 2.0,
            angular: 0.0,
        };
        assert_abs_diff_eq!(map.weighted_error(0, &w), 0.5 * 0.25 + 0.5, epsilon = 1e-12);
        let doubled = ErrorWeights {
            horizontal: 4.0,
            relative: 4.0,
            ..w
        };
        assert_abs_diff_eq!(
            map.weighted_error(0, &doubled),
            map.weighted_error(0, &w),
            epsilon = 1e-12
        );
    }

    #[test]
    fn zero_weights_give_zero_error() {
        let map = map_of(vec![sample(3.0, 0.1, 9.0, 0.0)]);
        let w = ErrorWeights {
            horizontal: 0.0,
            vertical: 0.0,
            relative: 0.0,
            angular: 0.0,
        };
        assert_eq!(map.weighted_error(0, &w), 0.0);
        assert_eq!(map.total_weighted_error(&w), 0.0);
    }

    #[test]
    fn totals_sum_over_points() {
        let map = map_of(vec![sample(1.5, 1.0, 1.0, 1.0), sample(1.0, 0.5, 1.0, 2.0)]);
        assert_eq!(map.metric_totals(), [0.25, 0.25, 0.0, 1.0]);
        let w = ErrorWeights::default();
        assert_abs_diff_eq!(map.total_weighted_error(&w), 1.5 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn cylinder_unrolls_without_distortion() {
        let contour = ContourModel::fit(&cone_samples(40, 50.0, 0.0, 200.0), 1e-6).unwrap();
        let mut blend = BlendCurve::new(0.5, 0.5);
        blend.set_bounds(compute_shape_bounds(&contour, 0.5, true, 64));
        // A cylinder develops to straight rows: push the row circles far out.
        let mut p = MappingParams::from(&Parameters::default());
        p.radius_scale = 1e6;
        let mapper = Mapper::new(&contour, &blend, p);
        let map = DistortionEstimator::new(mapper).evaluate(21, 17, DEFAULT_JITTER);
        assert_eq!(map.len(), 21 * 17);
        for s in map.samples() {
            for m in s.metrics() {
                assert!(m < 1e-6, "metric {} on a cylinder", m);
            }
        }
    }

    #[test]
    fn render_data_colours_every_point() {
        let contour = ContourModel::fit(&vase_samples(40, 120.0), 1e-6).unwrap();
        let blend = BlendCurve::new(0.5, 0.5);
        let mapper = Mapper::new(&contour, &blend, MappingParams::from(&Parameters::default()));
        let map = DistortionEstimator::new(mapper).evaluate(6, 5, DEFAULT_JITTER);
        for kind in ErrorKind::ALL {
            let data = map.render_data(kind);
            assert_eq!(data.colors.len(), 30);
            assert_eq!(data.triangles.len(), 2 * 5 * 4);
        }
    }
}
