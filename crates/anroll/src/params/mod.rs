//! Tunable parameter surface and its change tracking.
//!
//! [`Parameters`] is the plain serde value (JSON files, CLI overrides).
//! [`Param`] is one typed write; [`ParamKey`] names a parameter without a
//! value. Each key belongs to a [`ParamGroup`] that decides which derived
//! artifacts a change makes [`Dirty`].

mod store;

pub use store::{Dirty, GroupVersions, ParameterStore};

use serde::{Deserialize, Serialize};

use crate::distortion::ErrorWeights;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised when a parameter is addressed by name.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// No parameter has this name.
    UnknownName(String),
    /// The value does not have the parameter's type.
    InvalidValue {
        name: &'static str,
        expected: &'static str,
    },
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownName(name) => write!(f, "unknown parameter '{}'", name),
            Self::InvalidValue { name, expected } => {
                write!(f, "parameter '{}' expects {}", name, expected)
            }
        }
    }
}

impl std::error::Error for ParamError {}

// ── Parameter values ───────────────────────────────────────────────────────

/// Every user-facing setting of an unrolling session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Blend weight between the linear and the spline radius, `[0, 1]`.
    pub interpolation_target: f64,
    /// Position of the blend offset inside the shape bounds, `[0, 1]`.
    pub shape_factor: f64,
    /// Clamp shape bounds so the blend stays inside `[0, 1]` on `[0, 1]`.
    pub restrict_shape: bool,
    /// Multiplier on the row radius; its sign follows the profile slope.
    pub radius_scale: f64,
    /// `0` curved rows, `1` flat rows.
    pub tilt: f64,
    /// Horizontal texture offset as a fraction of the width (wraps).
    pub image_rotation: f64,
    /// Vertical texture offset as a fraction of the height.
    pub vertical_shift: f64,
    /// Preview resolution as a fraction of the source image.
    pub preview_scale: f64,
    pub crop_top: f64,
    pub crop_bottom: f64,
    pub crop_left: f64,
    pub crop_right: f64,
    /// Re-place rows so vertical spacing matches horizontal scale.
    pub enforce_isotropy: bool,
    /// Space rows uniformly in arc length rather than height.
    pub arc_length_uniform: bool,
    /// Relative roughness penalty of the radius spline (min `1e-6`).
    pub spline_smoothing: f64,
    /// Vertical lines of the overlay grid.
    pub grid_x: u32,
    /// Horizontal lines of the overlay grid.
    pub grid_y: u32,
    /// Error map resolution factor; the map is `500 · quality` square.
    pub error_map_quality: f64,
    /// Run the optimizer automatically after mapping-relevant changes.
    pub optimize_active: bool,
    pub optimize_interpolation_target: bool,
    pub optimize_shape_factor: bool,
    pub optimize_radius_scale: bool,
    /// Objective evaluation cap per optimization run.
    pub optimize_max_iterations: u32,
    pub weight_horizontal: f64,
    pub weight_vertical: f64,
    pub weight_relative: f64,
    pub weight_angular: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            interpolation_target: 0.5,
            shape_factor: 0.5,
            restrict_shape: true,
            radius_scale: 3.14,
            tilt: 0.0,
            image_rotation: 0.0,
            vertical_shift: 0.0,
            preview_scale: 1.0,
            crop_top: 0.0,
            crop_bottom: 0.0,
            crop_left: 0.0,
            crop_right: 0.0,
            enforce_isotropy: false,
            arc_length_uniform: false,
            spline_smoothing: 1e-6,
            grid_x: 15,
            grid_y: 15,
            error_map_quality: 1.0,
            optimize_active: false,
            optimize_interpolation_target: false,
            optimize_shape_factor: false,
            optimize_radius_scale: false,
            optimize_max_iterations: 1000,
            weight_horizontal: 1.0,
            weight_vertical: 1.0,
            weight_relative: 1.0,
            weight_angular: 1.0,
        }
    }
}

impl Parameters {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn error_weights(&self) -> ErrorWeights {
        ErrorWeights {
            horizontal: self.weight_horizontal,
            vertical: self.weight_vertical,
            relative: self.weight_relative,
            angular: self.weight_angular,
        }
    }

    /// Current value of `key`.
    pub fn get(&self, key: ParamKey) -> ParamValue {
        use ParamKey as K;
        use ParamValue::{Bool, Float, Int};
        match key {
            K::InterpolationTarget => Float(self.interpolation_target),
            K::ShapeFactor => Float(self.shape_factor),
            K::RestrictShape => Bool(self.restrict_shape),
            K::RadiusScale => Float(self.radius_scale),
            K::Tilt => Float(self.tilt),
            K::ImageRotation => Float(self.image_rotation),
            K::VerticalShift => Float(self.vertical_shift),
            K::PreviewScale => Float(self.preview_scale),
            K::CropTop => Float(self.crop_top),
            K::CropBottom => Float(self.crop_bottom),
            K::CropLeft => Float(self.crop_left),
            K::CropRight => Float(self.crop_right),
            K::EnforceIsotropy => Bool(self.enforce_isotropy),
            K::ArcLengthUniform => Bool(self.arc_length_uniform),
            K::SplineSmoothing => Float(self.spline_smoothing),
            K::GridX => Int(self.grid_x),
            K::GridY => Int(self.grid_y),
            K::ErrorMapQuality => Float(self.error_map_quality),
            K::OptimizeActive => Bool(self.optimize_active),
            K::OptimizeInterpolationTarget => Bool(self.optimize_interpolation_target),
            K::OptimizeShapeFactor => Bool(self.optimize_shape_factor),
            K::OptimizeRadiusScale => Bool(self.optimize_radius_scale),
            K::OptimizeMaxIterations => Int(self.optimize_max_iterations),
            K::WeightHorizontal => Float(self.weight_horizontal),
            K::WeightVertical => Float(self.weight_vertical),
            K::WeightRelative => Float(self.weight_relative),
            K::WeightAngular => Float(self.weight_angular),
        }
    }
}

/// Untyped parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(u32),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Bool(b) => f64::from(u8::from(b)),
            Self::Int(i) => f64::from(i),
            Self::Float(f) => f,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

// ── Keys and groups ────────────────────────────────────────────────────────

/// Change-propagation class of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamGroup {
    /// Radius spline refit.
    Fit,
    /// Vertical crop: height/arc windows and the linear approximation.
    Crop,
    /// Interpolation target and bound restriction: shape bounds.
    Target,
    /// Shape factor: blend offset only.
    Shape,
    /// Everything else the transform reads.
    Mapping,
    /// Optimizer switches, weights and caps.
    Optimizer,
    /// Texture placement of the image pass.
    Image,
    /// Overlay grid density.
    Grid,
    /// Error map resolution.
    Errors,
}

impl ParamGroup {
    pub const COUNT: usize = 9;

    pub const ALL: [ParamGroup; Self::COUNT] = [
        ParamGroup::Fit,
        ParamGroup::Crop,
        ParamGroup::Target,
        ParamGroup::Shape,
        ParamGroup::Mapping,
        ParamGroup::Optimizer,
        ParamGroup::Image,
        ParamGroup::Grid,
        ParamGroup::Errors,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

macro_rules! param_keys {
    ($( $key:ident => $name:literal, $group:ident; )*) => {
        /// Name of one parameter.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ParamKey {
            $( $key, )*
        }

        impl ParamKey {
            pub const ALL: &'static [ParamKey] = &[$( ParamKey::$key, )*];
            pub const COUNT: usize = Self::ALL.len();

            /// Wire name used in JSON files, `--set` overrides and feedback.
            pub fn name(self) -> &'static str {
                match self {
                    $( ParamKey::$key => $name, )*
                }
            }

            pub fn group(self) -> ParamGroup {
                match self {
                    $( ParamKey::$key => ParamGroup::$group, )*
                }
            }

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn from_name(name: &str) -> Option<ParamKey> {
                Self::ALL.iter().copied().find(|k| k.name() == name)
            }
        }
    };
}

param_keys! {
    InterpolationTarget => "interpolation_target", Target;
    ShapeFactor => "shape_factor", Shape;
    RestrictShape => "restrict_shape", Target;
    RadiusScale => "radius_scale", Mapping;
    Tilt => "tilt", Mapping;
    ImageRotation => "image_rotation", Image;
    VerticalShift => "vertical_shift", Image;
    PreviewScale => "preview_scale", Mapping;
    CropTop => "crop_top", Crop;
    CropBottom => "crop_bottom", Crop;
    CropLeft => "crop_left", Mapping;
    CropRight => "crop_right", Mapping;
    EnforceIsotropy => "enforce_isotropy", Mapping;
    ArcLengthUniform => "arc_length_uniform", Mapping;
    SplineSmoothing => "spline_smoothing", Fit;
    GridX => "grid_x", Grid;
    GridY => "grid_y", Grid;
    ErrorMapQuality => "error_map_quality", Errors;
    OptimizeActive => "optimize_active", Optimizer;
    OptimizeInterpolationTarget => "optimize_interpolation_target", Optimizer;
    OptimizeShapeFactor => "optimize_shape_factor", Optimizer;
    OptimizeRadiusScale => "optimize_radius_scale", Optimizer;
    OptimizeMaxIterations => "optimize_max_iterations", Optimizer;
    WeightHorizontal => "weight_horizontal", Optimizer;
    WeightVertical => "weight_vertical", Optimizer;
    WeightRelative => "weight_relative", Optimizer;
    WeightAngular => "weight_angular", Optimizer;
}

// ── Typed writes ───────────────────────────────────────────────────────────

/// One typed parameter write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    key: ParamKey,
    value: ParamValue,
}

impl Param {
    pub fn key(&self) -> ParamKey {
        self.key
    }

    pub fn value(&self) -> ParamValue {
        self.value
    }

    /// Build a write, checking the value against the key's type.
    ///
    /// Integers are accepted for floats; `0`/`1` are accepted for booleans.
    pub fn new(key: ParamKey, value: ParamValue) -> Result<Self, ParamError> {
        let expected = Parameters::default().get(key);
        let value = match (expected, value) {
            (ParamValue::Float(_), v @ ParamValue::Float(_)) => v,
            (ParamValue::Float(_), ParamValue::Int(i)) => ParamValue::Float(f64::from(i)),
            (ParamValue::Int(_), v @ ParamValue::Int(_)) => v,
            (ParamValue::Int(_), ParamValue::Float(f))
                if f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) =>
            {
                ParamValue::Int(f as u32)
            }
            (ParamValue::Bool(_), v @ ParamValue::Bool(_)) => v,
            (ParamValue::Bool(_), ParamValue::Int(i)) if i <= 1 => ParamValue::Bool(i == 1),
            (ParamValue::Bool(_), _) => {
                return Err(ParamError::InvalidValue {
                    name: key.name(),
                    expected: "a boolean",
                })
            }
            (ParamValue::Int(_), _) => {
                return Err(ParamError::InvalidValue {
                    name: key.name(),
                    expected: "a non-negative integer",
                })
            }
            (ParamValue::Float(_), ParamValue::Bool(_)) => {
                return Err(ParamError::InvalidValue {
                    name: key.name(),
                    expected: "a number",
                })
            }
        };
        Ok(Self { key, value })
    }

    /// Parse `name` and a JSON value.
    pub fn from_json(name: &str, value: &serde_json::Value) -> Result<Self, ParamError> {
        let key = ParamKey::from_name(name).ok_or_else(|| ParamError::UnknownName(name.into()))?;
        let value: ParamValue =
            serde_json::from_value(value.clone()).map_err(|_| ParamError::InvalidValue {
                name: key.name(),
                expected: "a number or boolean",
            })?;
        Self::new(key, value)
    }

    /// Parse a `name=value` override as typed on the command line.
    pub fn parse_assignment(text: &str) -> Result<Self, ParamError> {
        let (name, raw) = text
            .split_once('=')
            .ok_or_else(|| ParamError::UnknownName(text.into()))?;
        let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|_| {
            ParamError::InvalidValue {
                name: ParamKey::from_name(name.trim()).map_or("?", |k| k.name()),
                expected: "a number or boolean",
            }
        })?;
        Self::from_json(name.trim(), &value)
    }

    pub fn float(key: ParamKey, value: f64) -> Result<Self, ParamError> {
        Self::new(key, ParamValue::Float(value))
    }

    pub fn flag(key: ParamKey, value: bool) -> Result<Self, ParamError> {
        Self::new(key, ParamValue::Bool(value))
    }

    /// Write into `params`; returns whether the stored value changed.
    pub(crate) fn apply(self, params: &mut Parameters) -> bool {
        if params.get(self.key) == self.value {
            return false;
        }
        use ParamKey as K;
        let f = self.value.as_f64();
        let b = matches!(self.value, ParamValue::Bool(true));
        let i = match self.value {
            ParamValue::Int(i) => i,
            _ => 0,
        };
        match self.key {
            K::InterpolationTarget => params.interpolation_target = f,
            K::ShapeFactor => params.shape_factor = f,
            K::RestrictShape => params.restrict_shape = b,
            K::RadiusScale => params.radius_scale = f,
            K::Tilt => params.tilt = f,
            K::ImageRotation => params.image_rotation = f,
            K::VerticalShift => params.vertical_shift = f,
            K::PreviewScale => params.preview_scale = f,
            K::CropTop => params.crop_top = f,
            K::CropBottom => params.crop_bottom = f,
            K::CropLeft => params.crop_left = f,
            K::CropRight => params.crop_right = f,
            K::EnforceIsotropy => params.enforce_isotropy = b,
            K::ArcLengthUniform => params.arc_length_uniform = b,
            K::SplineSmoothing => params.spline_smoothing = f,
            K::GridX => params.grid_x = i,
            K::GridY => params.grid_y = i,
            K::ErrorMapQuality => params.error_map_quality = f,
            K::OptimizeActive => params.optimize_active = b,
            K::OptimizeInterpolationTarget => params.optimize_interpolation_target = b,
            K::OptimizeShapeFactor => params.optimize_shape_factor = b,
            K::OptimizeRadiusScale => params.optimize_radius_scale = b,
            K::OptimizeMaxIterations => params.optimize_max_iterations = i,
            K::WeightHorizontal => params.weight_horizontal = f,
            K::WeightVertical => params.weight_vertical = f,
            K::WeightRelative => params.weight_relative = f,
            K::WeightAngular => params.weight_angular = f,
        }
        true
    }
}
