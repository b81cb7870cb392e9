/// Shape-preserving piecewise cubic Hermite interpolant.
///
/// Interior slopes use the weighted harmonic mean of adjacent secants
/// (Fritsch–Butland), which keeps the interpolant monotone on monotone data.
/// Outside the sample domain the curve continues linearly with the end slope.
#[derive(Debug, Clone)]
pub struct MonotoneCubic {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
}

impl MonotoneCubic {
    /// Build from strictly increasing `xs`. Returns `None` for fewer than two
    /// knots or non-increasing abscissae.
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let n = xs.len();
        if n < 2 || ys.len() != n || xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }

        let secants: Vec<f64> = (0..n - 1)
            .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
            .collect();

        let mut slopes = vec![0.0; n];
        slopes[0] = secants[0];
        slopes[n - 1] = secants[n - 2];
        for k in 1..n - 1 {
            let (d0, d1) = (secants[k - 1], secants[k]);
            if d0 * d1 <= 0.0 {
                continue;
            }
            let h0 = xs[k] - xs[k - 1];
            let h1 = xs[k + 1] - xs[k];
            slopes[k] = 3.0 * (h0 + h1) / ((2.0 * h1 + h0) / d0 + (h1 + 2.0 * h0) / d1);
        }

        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes,
        })
    }

    /// `[x_first, x_last]`.
    pub fn domain(&self) -> [f64; 2] {
        [self.xs[0], self.xs[self.xs.len() - 1]]
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let [x_first, x_last] = self.domain();
        if x <= x_first {
            return self.ys[0] + self.slopes[0] * (x - x_first);
        }
        if x >= x_last {
            return self.ys[n - 1] + self.slopes[n - 1] * (x - x_last);
        }

        let k = self.xs.partition_point(|&xk| xk <= x).saturating_sub(1).min(n - 2);
        let h = self.xs[k + 1] - self.xs[k];
        let t = (x - self.xs[k]) / h;
        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.ys[k]
            + h10 * h * self.slopes[k]
            + h01 * self.ys[k + 1]
            + h11 * h * self.slopes[k + 1]
    }
}
