//! Quadratic blend curve `f(x) = a x² + d` on `[-1, 1]`.
//!
//! The curve is constrained so that its integral over `[0, 1]` equals the
//! interpolation target. `d` is picked inside the admissible shape bounds by
//! the shape factor and `a = 3 (target - d)` follows.

use serde::{Deserialize, Serialize};

/// Admissible interval for the blend offset `d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeBounds {
    pub min: f64,
    pub max: f64,
}

impl ShapeBounds {
    /// No constraint; the blend degenerates to a constant curve.
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// `min + factor * (max - min)`.
    pub fn lerp(&self, factor: f64) -> f64 {
        self.min + factor * (self.max - self.min)
    }

    /// Tighten to the overlap with `[lo, hi]`. NaN limits are ignored.
    pub fn intersect(self, lo: f64, hi: f64) -> Self {
        Self {
            min: if lo > self.min { lo } else { self.min },
            max: if hi < self.max { hi } else { self.max },
        }
    }
}

impl Default for ShapeBounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Blend curve with its derived coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendCurve {
    interpolation_target: f64,
    shape_factor: f64,
    bounds: ShapeBounds,
    a: f64,
    d: f64,
}

impl BlendCurve {
    pub fn new(interpolation_target: f64, shape_factor: f64) -> Self {
        let mut curve = Self {
            interpolation_target,
            shape_factor,
            bounds: ShapeBounds::UNBOUNDED,
            a: 0.0,
            d: interpolation_target,
        };
        curve.rederive();
        curve
    }

    pub fn set_interpolation_target(&mut self, target: f64) {
        self.interpolation_target = target;
        self.rederive();
    }

    pub fn set_shape_factor(&mut self, factor: f64) {
        self.shape_factor = factor;
        self.rederive();
    }

    pub fn set_bounds(&mut self, bounds: ShapeBounds) {
        self.bounds = bounds;
        self.rederive();
    }

    fn rederive(&mut self) {
        self.d = if self.bounds.is_finite() {
            self.bounds.lerp(self.shape_factor)
        } else {
            self.interpolation_target
        };
        self.a = 3.0 * (self.interpolation_target - self.d);
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * x * x + self.d
    }

    /// Closed-form integral over `[lo, hi]`.
    pub fn integrate(&self, lo: f64, hi: f64) -> f64 {
        self.a * (hi * hi * hi - lo * lo * lo) / 3.0 + self.d * (hi - lo)
    }

    /// `(a, d)`.
    pub fn coefficients(&self) -> (f64, f64) {
        (self.a, self.d)
    }

    pub fn interpolation_target(&self) -> f64 {
        self.interpolation_target
    }

    pub fn shape_factor(&self) -> f64 {
        self.shape_factor
    }

    pub fn bounds(&self) -> ShapeBounds {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unit_integral_matches_target() {
        for target in [0.0, 0.25, 0.5, 0.9] {
            for factor in [0.0, 0.3, 1.0] {
                let mut c = BlendCurve::new(target, factor);
                c.set_bounds(ShapeBounds::new(0.1, 0.8));
                assert_abs_diff_eq!(c.integrate(0.0, 1.0), target, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn offset_tracks_shape_factor() {
        let mut c = BlendCurve::new(0.5, 0.25);
        c.set_bounds(ShapeBounds::new(0.2, 0.6));
        let (a, d) = c.coefficients();
        assert_abs_diff_eq!(d, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(a, 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(c.evaluate(0.0), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(c.evaluate(-1.0), c.evaluate(1.0), epsilon = 1e-12);
    }

    #[test]
    fn resetting_bounds_is_idempotent() {
        let mut c = BlendCurve::new(0.4, 0.7);
        c.set_bounds(ShapeBounds::new(0.0, 0.6));
        let before = c;
        c.set_bounds(ShapeBounds::new(0.0, 0.6));
        assert_eq!(before, c);
    }

    #[test]
    fn infinite_bounds_fall_back_to_constant_curve() {
        let mut c = BlendCurve::new(0.35, 0.9);
        c.set_bounds(ShapeBounds::new(f64::NEG_INFINITY, 0.5));
        assert_eq!(c.coefficients(), (0.0, 0.35));
        assert_abs_diff_eq!(c.integrate(-0.5, 1.0), 0.35 * 1.5, epsilon = 1e-12);
    }

    #[test]
    fn intersect_ignores_nan() {
        let b = ShapeBounds::UNBOUNDED.intersect(f64::NAN, 0.4).intersect(0.1, f64::NAN);
        assert_eq!(b, ShapeBounds::new(0.1, 0.4));
    }
}
