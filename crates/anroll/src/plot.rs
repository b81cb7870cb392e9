//! Series for the side plots of the control surface.

use serde::{Deserialize, Serialize};

use crate::blend::BlendCurve;
use crate::contour::ContourModel;

/// Points per plotted series.
pub const PLOT_SAMPLES: usize = 100;

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Contour radius, its linear approximation and their IF blend over the
/// cropped arc-length window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpolationPlot {
    pub x: Vec<f64>,
    pub y_contour: Vec<f64>,
    pub y_linear: Vec<f64>,
    pub y_interp: Vec<f64>,
}

impl InterpolationPlot {
    pub fn compute(contour: &ContourModel, interpolation_target: f64) -> Self {
        let bounds = contour.arc_bounds();
        let x = linspace(bounds.lower, bounds.upper, PLOT_SAMPLES);
        let y_contour: Vec<f64> = x.iter().map(|&a| contour.radius_at_arc(a)).collect();
        let y_linear: Vec<f64> = x.iter().map(|&a| contour.linear_radius_at_arc(a)).collect();
        let y_interp = y_contour
            .iter()
            .zip(&y_linear)
            .map(|(r, l)| l + (r - l) * interpolation_target)
            .collect();
        Self {
            x,
            y_contour,
            y_linear,
            y_interp,
        }
    }
}

/// The blend curve over `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendPlot {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl BlendPlot {
    pub fn compute(blend: &BlendCurve) -> Self {
        let x = linspace(-1.0, 1.0, PLOT_SAMPLES);
        let y = x.iter().map(|&v| blend.evaluate(v)).collect();
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::vase_samples;
    use approx::assert_abs_diff_eq;

    #[test]
    fn interpolation_series_span_the_crop_window() {
        let mut contour = ContourModel::fit(&vase_samples(40, 120.0), 1e-6).unwrap();
        contour.set_crop(0.1, 0.2);
        contour.refit_linear_approximation();
        let plot = InterpolationPlot::compute(&contour, 0.25);
        assert_eq!(plot.x.len(), PLOT_SAMPLES);
        assert_abs_diff_eq!(plot.x[0], contour.arc_bounds().lower, epsilon = 1e-12);
        assert_abs_diff_eq!(plot.x[99], contour.arc_bounds().upper, epsilon = 1e-12);
        for i in 0..PLOT_SAMPLES {
            let expected = contour.radius_at(plot.x[i], 0.25);
            assert_abs_diff_eq!(plot.y_interp[i], expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn blend_plot_is_symmetric() {
        let mut blend = BlendCurve::new(0.6, 0.3);
        blend.set_bounds(crate::blend::ShapeBounds::new(0.2, 0.9));
        let plot = BlendPlot::compute(&blend);
        assert_eq!(plot.x.len(), PLOT_SAMPLES);
        assert_abs_diff_eq!(plot.x[0], -1.0);
        assert_abs_diff_eq!(plot.x[99], 1.0);
        for i in 0..PLOT_SAMPLES {
            assert_abs_diff_eq!(plot.y[i], plot.y[99 - i], epsilon = 1e-12);
        }
    }
}
