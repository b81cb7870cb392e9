//! Session-level error type.

use serde::{Deserialize, Serialize};

use crate::contour::ContourError;

/// Largest accepted sum of opposite crop fractions.
pub const MAX_CROP_SUM: f64 = 0.951;

/// Crop direction reported by [`EngineError::InvalidCropConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropAxis {
    /// Top + bottom.
    Vertical,
    /// Left + right.
    Horizontal,
}

/// Errors surfaced by [`crate::Engine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Contour samples failed validation or fitting.
    InvalidContour(ContourError),
    /// Opposite crop fractions leave no usable window.
    InvalidCropConfiguration {
        axis: CropAxis,
        /// Sum of the two fractions on `axis`.
        sum: f64,
    },
    /// The optimizer could not produce a result; parameters are unchanged.
    OptimizerFailure { reason: String },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContour(e) => write!(f, "invalid contour: {}", e),
            Self::InvalidCropConfiguration { axis, sum } => write!(
                f,
                "{:?} crop fractions sum to {:.3}, limit is {}",
                axis, sum, MAX_CROP_SUM
            ),
            Self::OptimizerFailure { reason } => write!(f, "optimizer failed: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidContour(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ContourError> for EngineError {
    fn from(e: ContourError) -> Self {
        Self::InvalidContour(e)
    }
}

/// Check both crop axes against [`MAX_CROP_SUM`].
pub(crate) fn check_crop(top: f64, bottom: f64, left: f64, right: f64) -> Result<(), EngineError> {
    for (axis, sum) in [
        (CropAxis::Vertical, top + bottom),
        (CropAxis::Horizontal, left + right),
    ] {
        if !(sum <= MAX_CROP_SUM) {
            return Err(EngineError::InvalidCropConfiguration { axis, sum });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_sum_is_checked_per_axis() {
        assert!(check_crop(0.5, 0.45, 0.0, 0.0).is_ok());
        assert_eq!(
            check_crop(0.5, 0.5, 0.0, 0.0),
            Err(EngineError::InvalidCropConfiguration {
                axis: CropAxis::Vertical,
                sum: 1.0
            })
        );
        assert!(matches!(
            check_crop(0.0, 0.0, 0.6, 0.4),
            Err(EngineError::InvalidCropConfiguration {
                axis: CropAxis::Horizontal,
                ..
            })
        ));
        assert!(check_crop(f64::NAN, 0.0, 0.0, 0.0).is_err());
    }
}
