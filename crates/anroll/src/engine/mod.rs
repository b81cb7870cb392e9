//! One unrolling session.
//!
//! [`Engine`] owns the fitted contour, the blend curve and the parameter
//! store. Parameter writes only bump version counters; [`Engine::reconcile`]
//! applies everything written since the last reconcile in dependency order
//! (splines → crop windows → linear fit → shape bounds → blend) and reports
//! which passes need to be redone. Every pass reconciles first, so a pass
//! never observes a stale derived state.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::blend::{BlendCurve, ShapeBounds};
use crate::contour::{ContourModel, ContourSamples};
use crate::distortion::{DistortionEstimator, DistortionMap};
use crate::error::{check_crop, EngineError};
use crate::feedback::{FeedbackEvent, FeedbackQueue};
use crate::mapping::{
    compute_shape_bounds, render_grid, render_image, LineData, Mapper, MappingParams,
    MappingTable, RenderData,
};
use crate::optimize::objective::DistortionObjective;
use crate::optimize::{self, Dimension, OptimizerConfig, SearchSpace, StopReason};
use crate::params::{Dirty, GroupVersions, Param, ParamError, ParameterStore, Parameters};
use crate::plot::{BlendPlot, InterpolationPlot};
use crate::sweep::{self, SweepAxis, SweepGrid, SweepRow};


/// Source raster size assumed until one is supplied.
pub const DEFAULT_SOURCE_SIZE: [u32; 2] = [1024, 1024];
/// Largest side of an image mapping pass.
pub const MAX_RENDER_RESOLUTION: u32 = 1000;
/// Side of the error map at quality `1`.
pub const ERROR_MAP_SIDE: f64 = 500.0;
/// Shape-bound rows used when no source raster size is known.
const DEFAULT_BOUND_SAMPLES: usize = 512;

// ── Outputs ────────────────────────────────────────────────────────────────

/// Passes invalidated by a reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemapFlags {
    pub image: bool,
    pub grid: bool,
    pub errors: bool,
}

impl RemapFlags {
    pub fn any(&self) -> bool {
        self.image || self.grid || self.errors
    }
}

impl From<Dirty> for RemapFlags {
    fn from(d: Dirty) -> Self {
        Self {
            image: d.image,
            grid: d.grid,
            errors: d.errors,
        }
    }
}

/// Result of a successful optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    /// Final value of every optimized dimension.
    pub values: Vec<(Dimension, f64)>,
    /// Total weighted error at the reported values.
    pub objective: f64,
    pub evaluations: usize,
    pub elapsed_s: f64,
    pub stop: StopReason,
}

// ── Engine ─────────────────────────────────────────────────────────────────

/// Unrolling session over one contour.
///
/// # Examples
///
/// ```no_run
/// use anroll::{ContourSamples, Engine, Param, ParamKey, Parameters};
/// use std::path::Path;
///
/// let samples = ContourSamples::from_json_file(Path::new("contour.json")).unwrap();
/// let mut engine = Engine::new(&samples, Parameters::default()).unwrap();
/// engine.set(Param::float(ParamKey::InterpolationTarget, 0.8).unwrap());
/// let flags = engine.reconcile().unwrap();
/// assert!(flags.image);
/// let mesh = engine.map_image(None).unwrap();
/// println!("{} mapped points", mesh.x.len());
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    contour: ContourModel,
    blend: BlendCurve,
    store: ParameterStore,
    /// Group versions folded into `contour`, `blend` and `applied`.
    consumed: GroupVersions,
    /// Parameter values as of the last successful reconcile.
    applied: Parameters,
    source_size: Option<[u32; 2]>,
    optimizer: OptimizerConfig,
    feedback: FeedbackQueue,
}

impl Engine {
    /// Fit the contour and derive the initial state from `params`.
    pub fn new(samples: &ContourSamples, params: Parameters) -> Result<Self, EngineError> {
        check_crop(
            params.crop_top,
            params.crop_bottom,
            params.crop_left,
            params.crop_right,
        )?;
        let mut contour = ContourModel::fit(samples, params.spline_smoothing)?;
        contour.set_crop(params.crop_top, params.crop_bottom);
        contour.refit_linear_approximation();

        let bounds = compute_shape_bounds(
            &contour,
            params.interpolation_target,
            params.restrict_shape,
            bound_samples(&params, None),
        );
        let mut blend = BlendCurve::new(params.interpolation_target, params.shape_factor);
        blend.set_bounds(bounds);

        let mut feedback = FeedbackQueue::default();
        push_bounds(&mut feedback, bounds);

        tracing::info!(
            samples = contour.samples().len(),
            arc_length = contour.arc_length(),
            slope = contour.linear_fit().slope,
            "engine ready"
        );

        let store = ParameterStore::new(params.clone());
        Ok(Self {
            contour,
            blend,
            consumed: store.versions(),
            store,
            applied: params,
            source_size: None,
            optimizer: OptimizerConfig::default(),
            feedback,
        })
    }

    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer = config;
        self
    }

    pub fn optimizer_config(&self) -> &OptimizerConfig {
        &self.optimizer
    }

    /// Size of the source photograph; drives the image pass size and the
    /// shape-bound sampling density.
    pub fn set_source_size(&mut self, width: u32, height: u32) {
        self.source_size = Some([width, height]);
    }

    /// Latest written values, possibly not yet reconciled.
    pub fn parameters(&self) -> &Parameters {
        self.store.values()
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Record one parameter write. Takes effect at the next reconcile.
    pub fn set(&mut self, param: Param) -> Dirty {
        self.store.set(param)
    }

    /// [`Engine::set`] from a `name` and a JSON value.
    pub fn set_by_name(&mut self, name: &str, value: &serde_json::Value) -> Result<Dirty, ParamError> {
        Ok(self.set(Param::from_json(name, value)?))
    }

    /// Apply pending parameter changes.
    ///
    /// With auto-optimization enabled, a mapping-relevant change also runs
    /// the optimizer; its failure is logged and does not fail the
    /// reconcile. An invalid crop fails without touching any state, and the
    /// pending changes stay pending.
    pub fn reconcile(&mut self) -> Result<RemapFlags, EngineError> {
        let mut dirty = self.sync()?;
        if dirty.mapping
            && self.applied.optimize_active
            && !self.enabled_dimensions().is_empty()
        {
            match self.run_optimizer() {
                Ok(_) => dirty |= self.sync()?,
                Err(e) => tracing::error!(error = %e, "auto-optimization failed"),
            }
        }
        Ok(RemapFlags::from(dirty))
    }

    /// Validate the pending crop and fold pending changes into the derived
    /// state. Never runs the optimizer.
    fn sync(&mut self) -> Result<Dirty, EngineError> {
        let dirty = self.store.changed_since(&self.consumed);
        if dirty.is_empty() {
            return Ok(dirty);
        }
        let values = self.store.values().clone();
        if let Err(e) = check_crop(
            values.crop_top,
            values.crop_bottom,
            values.crop_left,
            values.crop_right,
        ) {
            tracing::warn!(error = %e, "skipping reconcile");
            return Err(e);
        }

        let mut contour = self.contour.clone();
        let mut blend = self.blend.clone();
        if dirty.splines {
            contour.refit(values.spline_smoothing)?;
        }
        if dirty.bounds {
            contour.set_crop(values.crop_top, values.crop_bottom);
        }
        if dirty.linear_fit {
            contour.refit_linear_approximation();
        }
        let mut new_bounds = None;
        if dirty.shape_bounds {
            let bounds = compute_shape_bounds(
                &contour,
                values.interpolation_target,
                values.restrict_shape,
                bound_samples(&values, self.source_size),
            );
            tracing::debug!(min = bounds.min, max = bounds.max, "shape bounds recomputed");
            new_bounds = Some(bounds);
        }
        if dirty.blend {
            blend.set_interpolation_target(values.interpolation_target);
            if let Some(bounds) = new_bounds {
                blend.set_bounds(bounds);
            }
            blend.set_shape_factor(values.shape_factor);
        }

        self.contour = contour;
        self.blend = blend;
        self.applied = values;
        self.consumed = self.store.versions();
        if let Some(bounds) = new_bounds {
            push_bounds(&mut self.feedback, bounds);
        }
        tracing::debug!(?dirty, "reconciled");
        Ok(dirty)
    }

    /// Check the current crop fractions without reconciling.
    pub fn check_crop(&self) -> Result<(), EngineError> {
        let p = self.store.values();
        check_crop(p.crop_top, p.crop_bottom, p.crop_left, p.crop_right)
    }

    pub fn contour(&self) -> &ContourModel {
        &self.contour
    }

    pub fn blend(&self) -> &BlendCurve {
        &self.blend
    }

    pub fn shape_bounds(&self) -> ShapeBounds {
        self.blend.bounds()
    }

    /// Transform as of the last reconcile.
    pub fn mapper(&self) -> Mapper<'_> {
        Mapper::new(&self.contour, &self.blend, MappingParams::from(&self.applied))
    }

    /// [`Mapper::map_point`] as of the last reconcile.
    pub fn map_point(&self, x: f64, y: f64) -> [f64; 2] {
        self.mapper().map_point(x, y)
    }

    // ── Passes ─────────────────────────────────────────────────────────────

    /// Reconcile, then tabulate the transform on a `width × height` grid.
    pub fn mapping_table(&mut self, width: usize, height: usize) -> Result<MappingTable, EngineError> {
        self.reconcile()?;
        Ok(MappingTable::build(&self.mapper(), width, height))
    }

    /// `width × height` of the image pass for a source of `source` pixels.
    pub fn image_size(&self, source: [u32; 2]) -> [usize; 2] {
        let p = &self.applied;
        let w = source[0] as f64 * p.preview_scale * (1.0 - p.crop_left - p.crop_right);
        let h = source[1] as f64 * p.preview_scale * (1.0 - p.crop_top - p.crop_bottom);
        let cap = MAX_RENDER_RESOLUTION as f64;
        let shrink = (cap / w.max(h)).min(1.0);
        [
            ((w * shrink).round() as usize).max(2),
            ((h * shrink).round() as usize).max(2),
        ]
    }

    /// Image pass; colours are sampled when a source raster is given.
    pub fn map_image(&mut self, source: Option<&RgbaImage>) -> Result<RenderData, EngineError> {
        if let Some(img) = source {
            self.set_source_size(img.width(), img.height());
        }
        self.reconcile()?;
        let [w, h] = self.image_size(self.source_size.unwrap_or(DEFAULT_SOURCE_SIZE));
        let table = self.mapping_table(w, h)?;
        tracing::debug!(width = w, height = h, "image pass");
        Ok(render_image(&table, &self.applied, source))
    }

    /// Grid overlay pass.
    pub fn map_grid(&mut self) -> Result<LineData, EngineError> {
        self.reconcile()?;
        let (gx, gy) = (self.applied.grid_x as usize, self.applied.grid_y as usize);
        tracing::debug!(grid_x = gx, grid_y = gy, "grid pass");
        Ok(render_grid(&self.mapper(), gx, gy))
    }

    /// Distortion map of `500 · quality` squared points.
    pub fn map_errors(&mut self) -> Result<DistortionMap, EngineError> {
        self.reconcile()?;
        let side = ((ERROR_MAP_SIDE * self.applied.error_map_quality).round() as usize).max(2);
        tracing::debug!(side, "error pass");
        Ok(DistortionEstimator::new(self.mapper()).evaluate(side, side, self.optimizer.jitter))
    }

    pub fn interpolation_plot(&self) -> InterpolationPlot {
        InterpolationPlot::compute(&self.contour, self.blend.interpolation_target())
    }

    pub fn blend_plot(&self) -> BlendPlot {
        BlendPlot::compute(&self.blend)
    }

    /// Per-metric error totals over a Cartesian grid of IF, shape factor
    /// and radius scale, on the error-map grid.
    pub fn sweep(
        &mut self,
        interpolation_target: SweepAxis,
        shape_factor: SweepAxis,
        radius_scale: SweepAxis,
    ) -> Result<Vec<SweepRow>, EngineError> {
        self.sync()?;
        let grid = SweepGrid {
            side: ((ERROR_MAP_SIDE * self.applied.error_map_quality).round() as usize).max(2),
            jitter: self.optimizer.jitter,
            bound_samples: bound_samples(&self.applied, self.source_size),
        };
        Ok(sweep::run(
            &self.contour,
            &self.applied,
            [interpolation_target, shape_factor, radius_scale],
            grid,
        ))
    }

    // ── Optimization ───────────────────────────────────────────────────────

    /// Dimensions enabled in the current parameters.
    pub fn enabled_dimensions(&self) -> Vec<Dimension> {
        let p = self.store.values();
        [
            (p.optimize_interpolation_target, Dimension::InterpolationTarget),
            (p.optimize_shape_factor, Dimension::ShapeFactor),
            (p.optimize_radius_scale, Dimension::RadiusScale),
        ]
        .into_iter()
        .filter_map(|(on, dim)| on.then_some(dim))
        .collect()
    }

    /// Minimize the weighted distortion over the enabled dimensions.
    ///
    /// On success only the enabled dimensions are written back (one store
    /// write each) and their final values are queued as feedback. On
    /// failure no parameter changes.
    pub fn optimize(&mut self) -> Result<OptimizationReport, EngineError> {
        self.sync()?;
        let report = self.run_optimizer()?;
        self.sync()?;
        Ok(report)
    }

    fn run_optimizer(&mut self) -> Result<OptimizationReport, EngineError> {
        let fail = |reason: String| {
            tracing::error!(%reason, "optimizer failed");
            EngineError::OptimizerFailure { reason }
        };

        let dims = self.enabled_dimensions();
        let space = SearchSpace::new(&dims, self.contour.linear_fit().slope)
            .map_err(|e| fail(e.to_string()))?;
        let max_evals = self.applied.optimize_max_iterations as usize;
        tracing::info!(
            dims = ?dims,
            max_evals,
            max_seconds = self.optimizer.max_seconds,
            "optimizer started"
        );

        let outcome = {
            let mut objective = DistortionObjective::new(
                &self.contour,
                &self.applied,
                &self.blend,
                &dims,
                &self.optimizer,
                bound_samples(&self.applied, self.source_size),
            );
            optimize::minimize(|x| objective.evaluate(x), &space, max_evals, &self.optimizer)
                .map_err(|e| fail(e.to_string()))?
        };

        let writes = dims
            .iter()
            .zip(&outcome.x)
            .map(|(dim, &value)| Param::float(dim.key(), value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| fail(e.to_string()))?;
        for param in writes {
            self.store.set(param);
        }
        for (dim, &value) in dims.iter().zip(&outcome.x) {
            self.feedback.push(dim.name(), value);
        }

        tracing::info!(
            objective = outcome.objective,
            evaluations = outcome.evaluations,
            elapsed_s = outcome.elapsed_s,
            stop = ?outcome.stop,
            "optimizer finished"
        );
        Ok(OptimizationReport {
            values: dims.into_iter().zip(outcome.x).collect(),
            objective: outcome.objective,
            evaluations: outcome.evaluations,
            elapsed_s: outcome.elapsed_s,
            stop: outcome.stop,
        })
    }

    // ── Feedback ───────────────────────────────────────────────────────────

    pub fn pending_feedback(&self) -> usize {
        self.feedback.len()
    }

    /// Take every queued feedback event.
    pub fn drain_feedback(&mut self) -> Vec<FeedbackEvent> {
        self.feedback.drain()
    }
}

/// Rows sampled for the shape bounds: one per preview pixel row of the
/// cropped source, or a fixed count without a source.
fn bound_samples(params: &Parameters, source_size: Option<[u32; 2]>) -> usize {
    match source_size {
        Some([_, h]) => {
            let rows = h as f64 * params.preview_scale * (1.0 - params.crop_top - params.crop_bottom);
            (rows as usize).max(2)
        }
        None => DEFAULT_BOUND_SAMPLES,
    }
}

fn push_bounds(feedback: &mut FeedbackQueue, bounds: ShapeBounds) {
    feedback.push("shape_bounds_min", bounds.min);
    feedback.push("shape_bounds_max", bounds.max);
}
