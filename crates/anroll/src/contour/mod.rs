//! Contour model: splines fitted to the sampled silhouette profile.
//!
//! The profile arrives as three parallel sequences: height along the
//! vessel axis, arc length along the silhouette and the radius of the
//! surface at that point. Two splines are derived from them:
//!
//! - height → arc length, monotone cubic (shape preserving);
//! - arc length → radius, penalized least-squares cubic (smoothing).
//!
//! Crop settings select a height window; the arc window follows through the
//! first spline and a straight-line approximation of radius over arc length
//! is fitted on that window.

mod monotone;
mod smoothing;

pub use monotone::MonotoneCubic;
pub use smoothing::SmoothingSpline;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fewest distinct samples a contour fit accepts.
pub const MIN_CONTOUR_SAMPLES: usize = 4;
/// Samples drawn over the arc window for the linear approximation.
pub const LINEAR_FIT_SAMPLES: usize = 30;
/// Lower clamp for the radius spline smoothing.
pub const MIN_SMOOTHING: f64 = 1e-6;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while validating or fitting contour samples.
#[derive(Debug, Clone, PartialEq)]
pub enum ContourError {
    /// Fewer distinct samples than the fit needs.
    TooFewSamples {
        /// Required minimum.
        needed: usize,
        /// Distinct samples after deduplication.
        got: usize,
    },
    /// The three sequences differ in length.
    LengthMismatch {
        height: usize,
        arc_length: usize,
        radius: usize,
    },
    /// A sample value is NaN or infinite.
    NonFinite {
        /// Index of the offending sample.
        index: usize,
    },
    /// Heights or arc lengths decrease at `index`.
    NotSorted {
        /// Index of the offending sample.
        index: usize,
    },
    /// The contour has no arc-length extent.
    ZeroArcLength,
    /// The radius spline normal equations could not be solved.
    SingularFit,
}

impl std::fmt::Display for ContourError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewSamples { needed, got } => {
                write!(f, "too few contour samples: need {}, got {}", needed, got)
            }
            Self::LengthMismatch {
                height,
                arc_length,
                radius,
            } => write!(
                f,
                "contour sequences differ in length: height {}, arc_length {}, radius {}",
                height, arc_length, radius
            ),
            Self::NonFinite { index } => write!(f, "non-finite contour sample at index {}", index),
            Self::NotSorted { index } => {
                write!(f, "contour heights/arc lengths decrease at index {}", index)
            }
            Self::ZeroArcLength => write!(f, "contour has zero arc length"),
            Self::SingularFit => write!(f, "radius spline fit is singular"),
        }
    }
}

impl std::error::Error for ContourError {}

// ── Input samples ──────────────────────────────────────────────────────────

/// Raw contour profile as produced by the silhouette extraction stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourSamples {
    /// Height along the vessel axis, non-decreasing.
    pub height: Vec<f64>,
    /// Arc length along the silhouette at the same heights, non-decreasing.
    pub arc_length: Vec<f64>,
    /// Surface radius at the same heights.
    pub radius: Vec<f64>,
}

impl ContourSamples {
    pub fn new(height: Vec<f64>, arc_length: Vec<f64>, radius: Vec<f64>) -> Self {
        Self {
            height,
            arc_length,
            radius,
        }
    }

    /// Load from a JSON file with `height`, `arc_length` and `radius` arrays.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn len(&self) -> usize {
        self.height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }

    /// Validate and drop samples that repeat the previous height.
    fn validated(&self) -> Result<ContourSamples, ContourError> {
        let n = self.height.len();
        if self.arc_length.len() != n || self.radius.len() != n {
            return Err(ContourError::LengthMismatch {
                height: n,
                arc_length: self.arc_length.len(),
                radius: self.radius.len(),
            });
        }

        let mut out = ContourSamples::new(
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        );
        for i in 0..n {
            let (h, a, r) = (self.height[i], self.arc_length[i], self.radius[i]);
            if !(h.is_finite() && a.is_finite() && r.is_finite()) {
                return Err(ContourError::NonFinite { index: i });
            }
            if let (Some(&ph), Some(&pa)) = (out.height.last(), out.arc_length.last()) {
                if h < ph || a < pa {
                    return Err(ContourError::NotSorted { index: i });
                }
                if h == ph {
                    continue;
                }
            }
            out.height.push(h);
            out.arc_length.push(a);
            out.radius.push(r);
        }

        if out.len() < MIN_CONTOUR_SAMPLES {
            return Err(ContourError::TooFewSamples {
                needed: MIN_CONTOUR_SAMPLES,
                got: out.len(),
            });
        }
        if out.arc_length[out.len() - 1] - out.arc_length[0] <= 0.0 {
            return Err(ContourError::ZeroArcLength);
        }
        Ok(out)
    }
}

// ── Derived types ──────────────────────────────────────────────────────────

/// Closed interval used for crop windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: f64,
}

impl Bounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// `lower + (upper - lower) * t`.
    pub fn interp(&self, t: f64) -> f64 {
        self.lower + (self.upper - self.lower) * t
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Straight line `radius ≈ slope * arc + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn eval(&self, arc: f64) -> f64 {
        self.slope * arc + self.intercept
    }

    /// Ordinary least squares. A zero-variance abscissa yields a flat line
    /// through the mean.
    pub fn least_squares(xs: &[f64], ys: &[f64]) -> Self {
        let n = xs.len().min(ys.len()).max(1) as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (x, y) in xs.iter().zip(ys) {
            sxy += (x - mx) * (y - my);
            sxx += (x - mx) * (x - mx);
        }
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        Self {
            slope,
            intercept: my - slope * mx,
        }
    }
}

// ── Model ──────────────────────────────────────────────────────────────────

/// Fitted contour with crop windows and linear approximation.
///
/// Every refit or crop change bumps [`ContourModel::generation`], which
/// mapping tables record to detect staleness.
#[derive(Debug, Clone)]
pub struct ContourModel {
    samples: ContourSamples,
    height_to_arc: MonotoneCubic,
    arc_to_radius: SmoothingSpline,
    smoothing: f64,
    crop: [f64; 2],
    height_bounds: Bounds,
    arc_bounds: Bounds,
    linear: LinearFit,
    generation: u64,
}

impl ContourModel {
    /// Validate samples and fit both splines with no crop applied.
    pub fn fit(samples: &ContourSamples, smoothing: f64) -> Result<Self, ContourError> {
        let samples = samples.validated()?;
        let smoothing = smoothing.max(MIN_SMOOTHING);
        let (height_to_arc, arc_to_radius) = fit_splines(&samples, smoothing)?;
        let mut model = Self {
            samples,
            height_to_arc,
            arc_to_radius,
            smoothing,
            crop: [0.0, 0.0],
            height_bounds: Bounds::new(0.0, 0.0),
            arc_bounds: Bounds::new(0.0, 0.0),
            linear: LinearFit {
                slope: 0.0,
                intercept: 0.0,
            },
            generation: 0,
        };
        model.apply_crop();
        model.refit_linear_approximation();
        tracing::debug!(
            samples = model.samples.len(),
            smoothing,
            slope = model.linear.slope,
            "contour fitted"
        );
        Ok(model)
    }

    /// Rebuild both splines with a new smoothing value, keeping the crop.
    ///
    /// On failure the model is left unchanged.
    pub fn refit(&mut self, smoothing: f64) -> Result<(), ContourError> {
        let smoothing = smoothing.max(MIN_SMOOTHING);
        let (height_to_arc, arc_to_radius) = fit_splines(&self.samples, smoothing)?;
        self.height_to_arc = height_to_arc;
        self.arc_to_radius = arc_to_radius;
        self.smoothing = smoothing;
        self.apply_crop();
        self.refit_linear_approximation();
        Ok(())
    }

    /// Set the vertical crop fractions (top, bottom) and update both windows.
    pub fn set_crop(&mut self, top: f64, bottom: f64) {
        self.crop = [top, bottom];
        self.apply_crop();
    }

    /// Crop the top `fraction` of the height range.
    pub fn crop_top(&mut self, fraction: f64) {
        self.set_crop(fraction, self.crop[1]);
    }

    /// Crop the bottom `fraction` of the height range.
    pub fn crop_bottom(&mut self, fraction: f64) {
        self.set_crop(self.crop[0], fraction);
    }

    fn apply_crop(&mut self) {
        let [h0, h1] = self.height_to_arc.domain();
        let span = h1 - h0;
        let lower = h0 + span * self.crop[0];
        let upper = h0 + span * (1.0 - self.crop[1]);
        self.height_bounds = Bounds::new(lower, upper);
        self.arc_bounds = Bounds::new(self.arc_at_height(lower), self.arc_at_height(upper));
        self.generation += 1;
    }

    /// Refit the straight-line approximation on the current arc window.
    pub fn refit_linear_approximation(&mut self) {
        let n = LINEAR_FIT_SAMPLES;
        let arcs: Vec<f64> = (0..n)
            .map(|i| self.arc_bounds.interp(i as f64 / (n - 1) as f64))
            .collect();
        let radii: Vec<f64> = arcs.iter().map(|&a| self.radius_at_arc(a)).collect();
        self.linear = LinearFit::least_squares(&arcs, &radii);
        self.generation += 1;
    }

    pub fn arc_at_height(&self, height: f64) -> f64 {
        self.height_to_arc.eval(height)
    }

    pub fn radius_at_arc(&self, arc: f64) -> f64 {
        self.arc_to_radius.eval(arc)
    }

    pub fn linear_radius_at_arc(&self, arc: f64) -> f64 {
        self.linear.eval(arc)
    }

    /// Radius blended between the linear approximation (`t = 0`) and the
    /// spline (`t = 1`).
    pub fn radius_at(&self, arc: f64, t: f64) -> f64 {
        let linear = self.linear_radius_at_arc(arc);
        linear + (self.radius_at_arc(arc) - linear) * t
    }

    /// Largest sampled height.
    pub fn height(&self) -> f64 {
        self.height_to_arc.domain()[1]
    }

    /// Arc length at the first sample.
    pub fn arc_origin(&self) -> f64 {
        self.samples.arc_length[0]
    }

    /// Total arc length (last sampled arc value).
    pub fn arc_length(&self) -> f64 {
        self.samples.arc_length[self.samples.len() - 1]
    }

    pub fn height_bounds(&self) -> Bounds {
        self.height_bounds
    }

    pub fn arc_bounds(&self) -> Bounds {
        self.arc_bounds
    }

    pub fn linear_fit(&self) -> LinearFit {
        self.linear
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn crop(&self) -> [f64; 2] {
        self.crop
    }

    pub fn samples(&self) -> &ContourSamples {
        &self.samples
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

fn fit_splines(
    samples: &ContourSamples,
    smoothing: f64,
) -> Result<(MonotoneCubic, SmoothingSpline), ContourError> {
    let height_to_arc = MonotoneCubic::new(&samples.height, &samples.arc_length).ok_or(
        ContourError::TooFewSamples {
            needed: MIN_CONTOUR_SAMPLES,
            got: samples.len(),
        },
    )?;
    let knots = (samples.len() / 2).max(MIN_CONTOUR_SAMPLES);
    let arc_to_radius =
        SmoothingSpline::fit(&samples.arc_length, &samples.radius, knots, smoothing)
            .ok_or(ContourError::SingularFit)?;
    Ok((height_to_arc, arc_to_radius))
}
