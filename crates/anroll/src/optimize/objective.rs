use crate::blend::BlendCurve;
use crate::contour::ContourModel;
use crate::distortion::{DistortionEstimator, ErrorWeights};
use crate::mapping::{compute_shape_bounds, Mapper, MappingParams};
use crate::params::Parameters;

use super::{Dimension, OptimizerConfig};

/// Weighted distortion of a candidate parameter vector.
///
/// Works on private copies of the parameters and the blend curve so a
/// failed or interrupted run leaves the session untouched.
pub(crate) struct DistortionObjective<'a> {
    contour: &'a ContourModel,
    params: Parameters,
    blend: BlendCurve,
    dims: Vec<Dimension>,
    weights: ErrorWeights,
    grid: usize,
    jitter: f64,
    bound_samples: usize,
}

impl<'a> DistortionObjective<'a> {
    pub fn new(
        contour: &'a ContourModel,
        params: &Parameters,
        blend: &BlendCurve,
        dims: &[Dimension],
        config: &OptimizerConfig,
        bound_samples: usize,
    ) -> Self {
        Self {
            contour,
            params: params.clone(),
            blend: blend.clone(),
            dims: dims.to_vec(),
            weights: params.error_weights(),
            grid: config.grid_size.max(2),
            jitter: config.jitter,
            bound_samples,
        }
    }

    /// Apply `x` (one value per dimension) and return the total weighted
    /// error over the square evaluation grid.
    pub fn evaluate(&mut self, x: &[f64]) -> f64 {
        for (&dim, &value) in self.dims.iter().zip(x) {
            match dim {
                Dimension::InterpolationTarget => {
                    self.params.interpolation_target = value;
                    self.blend.set_interpolation_target(value);
                    self.blend.set_bounds(compute_shape_bounds(
                        self.contour,
                        value,
                        self.params.restrict_shape,
                        self.bound_samples,
                    ));
                }
                Dimension::ShapeFactor => {
                    self.params.shape_factor = value;
                    self.blend.set_shape_factor(value);
                }
                Dimension::RadiusScale => self.params.radius_scale = value,
            }
        }
        let mapper = Mapper::new(self.contour, &self.blend, MappingParams::from(&self.params));
        DistortionEstimator::new(mapper)
            .evaluate(self.grid, self.grid, self.jitter)
            .total_weighted_error(&self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::cone_samples;

    fn cone() -> ContourModel {
        ContourModel::fit(&cone_samples(40, 50.0, 0.5, 200.0), 1e-6).unwrap()
    }

    #[test]
    fn exact_development_scores_near_zero() {
        let contour = cone();
        let m = 0.5 / (1.0f64 + 0.25).sqrt();
        let params = Parameters {
            interpolation_target: 1.0,
            ..Parameters::default()
        };
        let blend = BlendCurve::new(1.0, 0.5);
        let config = OptimizerConfig {
            grid_size: 20,
            ..OptimizerConfig::default()
        };
        let mut objective = DistortionObjective::new(
            &contour,
            &params,
            &blend,
            &[Dimension::RadiusScale],
            &config,
            64,
        );
        let good = objective.evaluate(&[1.0 / m]);
        let bad = objective.evaluate(&[0.6]);
        assert!(good < 1e-6, "good = {}", good);
        assert!(bad > good);
    }

    #[test]
    fn zero_radius_is_not_finite() {
        let contour = cone();
        let mut objective = DistortionObjective::new(
            &contour,
            &Parameters::default(),
            &BlendCurve::new(0.5, 0.5),
            &[Dimension::RadiusScale],
            &OptimizerConfig {
                grid_size: 8,
                ..OptimizerConfig::default()
            },
            64,
        );
        assert!(!objective.evaluate(&[0.0]).is_finite());
    }
}
