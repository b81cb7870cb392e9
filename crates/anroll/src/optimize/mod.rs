//! Bounded minimization of the weighted distortion.
//!
//! The search runs in the unit cube; [`SearchSpace`] maps it onto the real
//! parameter ranges. One free dimension uses a DIRECT space-partitioning
//! search followed by a golden-section polish; two or more use a seeded
//! multi-level single-linkage multistart with Nelder–Mead local searches.
//! All paths share one [`budget::Evaluator`] that enforces the evaluation
//! cap and the wall-clock deadline between evaluations.

mod budget;
mod direct;
mod golden;
mod multistart;
mod nelder_mead;
pub(crate) mod objective;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;

use crate::distortion::DEFAULT_JITTER;
use crate::params::ParamKey;

use budget::Evaluator;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised by [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    /// No dimension is enabled for optimization.
    NoEnabledDimensions,
    /// The budget allowed no evaluation at all.
    NoEvaluations,
    /// Every evaluation returned NaN or infinity.
    NonFiniteObjective { evaluations: usize },
    /// A dimension's range is empty or not finite.
    InvalidBounds { dimension: Dimension },
}

impl std::fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEnabledDimensions => write!(f, "no dimension enabled for optimization"),
            Self::NoEvaluations => write!(f, "evaluation budget is empty"),
            Self::NonFiniteObjective { evaluations } => write!(
                f,
                "objective was non-finite in all {} evaluations",
                evaluations
            ),
            Self::InvalidBounds { dimension } => {
                write!(f, "invalid search range for {}", dimension.name())
            }
        }
    }
}

impl std::error::Error for OptimizeError {}

// ── Configuration ──────────────────────────────────────────────────────────

/// Free parameter of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    InterpolationTarget,
    ShapeFactor,
    RadiusScale,
}

impl Dimension {
    pub fn key(self) -> ParamKey {
        match self {
            Self::InterpolationTarget => ParamKey::InterpolationTarget,
            Self::ShapeFactor => ParamKey::ShapeFactor,
            Self::RadiusScale => ParamKey::RadiusScale,
        }
    }

    pub fn name(self) -> &'static str {
        self.key().name()
    }
}

/// Tuning of an optimization run that is not part of [`crate::Parameters`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Side of the square distortion grid evaluated per objective call.
    pub grid_size: usize,
    /// Finite-difference jitter of the distortion grid.
    pub jitter: f64,
    /// Wall-clock limit of one run, seconds.
    pub max_seconds: f64,
    /// Local search stops when the simplex values spread less than this.
    pub local_ftol_abs: f64,
    /// Seed of the multistart sampler.
    pub seed: u64,
    /// Uniform samples drawn per multistart round.
    pub samples_per_round: usize,
    /// Evaluations spent on the 1-D golden-section polish.
    pub polish_evals: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            grid_size: 100,
            jitter: DEFAULT_JITTER,
            max_seconds: 10.0,
            local_ftol_abs: 1e-5,
            seed: 0x5eed,
            samples_per_round: 16,
            polish_evals: 30,
        }
    }
}

/// Box-bounded search domain with its starting point.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    dims: Vec<Dimension>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    initial: Vec<f64>,
}

impl SearchSpace {
    /// Standard ranges: IF and shape factor in `[0, 1]` starting at `0.5`;
    /// radius scale on the side matching the sign of the profile slope,
    /// starting at `±π`.
    pub fn new(dims: &[Dimension], slope: f64) -> Result<Self, OptimizeError> {
        if dims.is_empty() {
            return Err(OptimizeError::NoEnabledDimensions);
        }
        let mut space = Self {
            dims: dims.to_vec(),
            lower: Vec::with_capacity(dims.len()),
            upper: Vec::with_capacity(dims.len()),
            initial: Vec::with_capacity(dims.len()),
        };
        for &dim in dims {
            let (lo, hi, start) = match dim {
                Dimension::InterpolationTarget | Dimension::ShapeFactor => (0.0, 1.0, 0.5),
                Dimension::RadiusScale if slope < 0.0 => (-500.0, 0.5, -PI),
                Dimension::RadiusScale => (0.5, 500.0, PI),
            };
            space.lower.push(lo);
            space.upper.push(hi);
            space.initial.push(start);
        }
        Ok(space)
    }

    /// Explicit ranges; `initial` is clamped into the box.
    pub fn with_bounds(
        dims: &[Dimension],
        lower: &[f64],
        upper: &[f64],
        initial: &[f64],
    ) -> Result<Self, OptimizeError> {
        if dims.is_empty() {
            return Err(OptimizeError::NoEnabledDimensions);
        }
        for (i, &dimension) in dims.iter().enumerate() {
            let (lo, hi) = (lower.get(i), upper.get(i));
            let valid = matches!((lo, hi, initial.get(i)), (Some(lo), Some(hi), Some(_))
                if lo.is_finite() && hi.is_finite() && lo < hi);
            if !valid {
                return Err(OptimizeError::InvalidBounds { dimension });
            }
        }
        let n = dims.len();
        Ok(Self {
            dims: dims.to_vec(),
            lower: lower[..n].to_vec(),
            upper: upper[..n].to_vec(),
            initial: (0..n).map(|i| initial[i].clamp(lower[i], upper[i])).collect(),
        })
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.dims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn initial(&self) -> &[f64] {
        &self.initial
    }

    fn to_real(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .enumerate()
            .map(|(i, &t)| self.lower[i] + (self.upper[i] - self.lower[i]) * t)
            .collect()
    }

    fn to_unit(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &v)| ((v - self.lower[i]) / (self.upper[i] - self.lower[i])).clamp(0.0, 1.0))
            .collect()
    }
}

// ── Driver ─────────────────────────────────────────────────────────────────

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The search met its own convergence test.
    Converged,
    /// The evaluation cap was reached.
    MaxEvaluations,
    /// The wall-clock deadline passed.
    Deadline,
}

/// Best point found by [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Best point in real coordinates, one value per dimension.
    pub x: Vec<f64>,
    pub objective: f64,
    pub evaluations: usize,
    pub elapsed_s: f64,
    pub stop: StopReason,
}

/// Minimize `objective` over `space` within `max_evals` evaluations and
/// `config.max_seconds`.
///
/// Non-finite objective values are treated as `f64::MAX` by the search and
/// never reported as the optimum.
pub fn minimize(
    mut objective: impl FnMut(&[f64]) -> f64,
    space: &SearchSpace,
    max_evals: usize,
    config: &OptimizerConfig,
) -> Result<Outcome, OptimizeError> {
    if space.is_empty() {
        return Err(OptimizeError::NoEnabledDimensions);
    }
    let deadline = Duration::from_secs_f64(config.max_seconds.max(0.0));
    let mut ev = Evaluator::new(|u: &[f64]| objective(&space.to_real(u)), max_evals, deadline);

    let start = space.to_unit(&space.initial);
    if space.len() == 1 {
        direct::minimize(&mut ev, config);
    } else {
        multistart::minimize(&mut ev, &start, config);
    }

    let evaluations = ev.evaluations();
    let elapsed_s = ev.elapsed().as_secs_f64();
    let stop = ev.stop_reason().unwrap_or(StopReason::Converged);
    match ev.into_best() {
        Some((u, value)) => Ok(Outcome {
            x: space.to_real(&u),
            objective: value,
            evaluations,
            elapsed_s,
            stop,
        }),
        None if evaluations == 0 => Err(OptimizeError::NoEvaluations),
        None => Err(OptimizeError::NonFiniteObjective { evaluations }),
    }
}
