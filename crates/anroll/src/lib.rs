//! anroll — unroll photographs of curved surfaces of revolution.
//!
//! Given the silhouette profile of a vessel (height, arc length and radius
//! sampled along the contour) the engine builds a destination → source
//! mapping that develops the surface onto a flat plane. The stages are:
//!
//! 1. **Contour** – monotone height → arc spline, smoothed arc → radius
//!    spline, crop bounds and a linear approximation of the profile.
//! 2. **Blend** – a quadratic curve that trades the true radius against the
//!    linear one across the unrolled width.
//! 3. **Mapping** – the polar transform from canonical `(x, y)` to source
//!    coordinates, plus the table passes for image, grid and error maps.
//! 4. **Distortion** – local horizontal, vertical, relative and angular
//!    distortion metrics from a jittered mapping.
//! 5. **Optimize** – bounded global/local search of the free parameters that
//!    minimises the weighted distortion.
//!
//! # Public API
//! - [`Engine`] owns one session: contour, parameters and derived state
//! - [`Parameters`] and [`Param`] for the tunable surface
//! - [`ContourSamples`] as the profile input
//! - [`DistortionMap`], [`RenderData`] and [`LineData`] as pass outputs

mod blend;
mod contour;
mod distortion;
mod engine;
mod error;
mod feedback;
mod mapping;
mod optimize;
mod params;
mod plot;
mod quadrature;
mod sweep;

#[cfg(test)]
pub(crate) mod test_utils;

pub use blend::{BlendCurve, ShapeBounds};
pub use contour::{Bounds, ContourError, ContourModel, ContourSamples, LinearFit};
pub use distortion::{
    error_color, DistortionEstimator, DistortionMap, DistortionSample, ErrorKind, ErrorWeights,
    DEFAULT_JITTER,
};
pub use engine::{
    Engine, OptimizationReport, RemapFlags, DEFAULT_SOURCE_SIZE, ERROR_MAP_SIDE,
    MAX_RENDER_RESOLUTION,
};
pub use error::{CropAxis, EngineError, MAX_CROP_SUM};
pub use feedback::{FeedbackEvent, FeedbackQueue};
pub use mapping::{
    compute_shape_bounds, LineData, Mapper, MappingParams, MappingTable, RenderData, RowSample,
};
pub use optimize::{Dimension, OptimizeError, OptimizerConfig, SearchSpace, StopReason};
pub use params::{
    Dirty, Param, ParamError, ParamGroup, ParamKey, ParamValue, ParameterStore, Parameters,
};
pub use plot::{BlendPlot, InterpolationPlot, PLOT_SAMPLES};
pub use quadrature::integrate_adaptive;
pub use sweep::{SweepAxis, SweepRow};
