use nalgebra::{DMatrix, DVector};

/// Penalized least-squares cubic B-spline on uniform knots.
///
/// The roughness penalty is the squared second difference of adjacent
/// coefficients, scaled so that `smoothing` is relative to the data term.
/// Beyond the knot range the end segments are extended polynomially.
#[derive(Debug, Clone)]
pub struct SmoothingSpline {
    x0: f64,
    step: f64,
    intervals: usize,
    coeffs: Vec<f64>,
}

/// Uniform cubic B-spline basis weights at local parameter `t`.
fn basis(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let s = 1.0 - t;
    [
        s * s * s / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

impl SmoothingSpline {
    /// Fit `knots` uniformly spaced knots over the data range.
    ///
    /// Returns `None` when the x range is degenerate or the normal equations
    /// cannot be solved.
    pub fn fit(xs: &[f64], ys: &[f64], knots: usize, smoothing: f64) -> Option<Self> {
        let n = xs.len();
        if n == 0 || ys.len() != n || knots < 2 {
            return None;
        }
        let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(x_max > x_min) {
            return None;
        }

        let intervals = knots - 1;
        let step = (x_max - x_min) / intervals as f64;
        let n_coef = intervals + 3;
        let mut spline = Self {
            x0: x_min,
            step,
            intervals,
            coeffs: vec![0.0; n_coef],
        };

        let mut b = DMatrix::<f64>::zeros(n, n_coef);
        for (row, &x) in xs.iter().enumerate() {
            let (j, t) = spline.locate(x);
            for (k, w) in basis(t).iter().enumerate() {
                b[(row, j + k)] = *w;
            }
        }

        let mut d = DMatrix::<f64>::zeros(n_coef - 2, n_coef);
        for r in 0..n_coef - 2 {
            d[(r, r)] = 1.0;
            d[(r, r + 1)] = -2.0;
            d[(r, r + 2)] = 1.0;
        }

        let btb = b.transpose() * &b;
        let dtd = d.transpose() * &d;
        let data_scale = btb.trace();
        let lambda = smoothing.max(0.0) * data_scale / dtd.trace();
        let ridge = 1e-12 * data_scale / n_coef as f64;
        let mut lhs = btb + dtd * lambda;
        for i in 0..n_coef {
            lhs[(i, i)] += ridge;
        }
        let rhs = b.transpose() * DVector::from_column_slice(ys);

        let solution = match lhs.clone().cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => lhs.lu().solve(&rhs)?,
        };
        if solution.iter().any(|c| !c.is_finite()) {
            return None;
        }
        spline.coeffs = solution.iter().copied().collect();
        Some(spline)
    }

    /// Segment index and local parameter; `t` leaves `[0, 1]` when
    /// extrapolating past the ends.
    fn locate(&self, x: f64) -> (usize, f64) {
        let u = (x - self.x0) / self.step;
        let j = u.floor().clamp(0.0, (self.intervals - 1) as f64) as usize;
        (j, u - j as f64)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let (j, t) = self.locate(x);
        basis(t)
            .iter()
            .zip(&self.coeffs[j..j + 4])
            .map(|(w, c)| w * c)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn linear_data_is_reproduced_for_any_smoothing() {
        let xs: Vec<f64> = (0..40).map(|i| i as f64 * 0.37).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 12.0 - 0.8 * x).collect();
        for smoothing in [1e-6, 1e-2, 10.0] {
            let s = SmoothingSpline::fit(&xs, &ys, 20, smoothing).unwrap();
            for x in [0.0, 1.1, 7.7, 14.43] {
                assert_abs_diff_eq!(s.eval(x), 12.0 - 0.8 * x, epsilon = 1e-7);
            }
            assert_abs_diff_eq!(s.eval(16.0), 12.0 - 0.8 * 16.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn small_smoothing_follows_curved_data() {
        let xs: Vec<f64> = (0..60).map(|i| i as f64 / 59.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (3.0 * x).sin()).collect();
        let s = SmoothingSpline::fit(&xs, &ys, 30, 1e-6).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(s.eval(*x), *y, epsilon = 1e-4);
        }
    }

    #[test]
    fn heavy_smoothing_flattens_curvature() {
        let xs: Vec<f64> = (0..60).map(|i| i as f64 / 59.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (x - 0.5).powi(2)).collect();
        let light = SmoothingSpline::fit(&xs, &ys, 30, 1e-6).unwrap();
        let heavy = SmoothingSpline::fit(&xs, &ys, 30, 1e6).unwrap();
        let bend = |s: &SmoothingSpline| s.eval(0.0) + s.eval(1.0) - 2.0 * s.eval(0.5);
        assert!(bend(&heavy).abs() < bend(&light).abs());
    }

    #[test]
    fn degenerate_range_is_rejected() {
        assert!(SmoothingSpline::fit(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0], 4, 1e-6).is_none());
    }
}
