use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidRangeError;
use crate::noise::NoiseModel;

/// Tolerance used when the caller does not supply one, in percent of full scale
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 1.0;
/// Number of calibration points used when the caller does not supply one
pub const DEFAULT_POINT_COUNT: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Input,
    Output,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// The stimulus (input) and signal (output) bounds of an instrument
///
/// A valid range has finite bounds with `min < max` on both axes; see [`Self::validate`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    pub input_min: f64,
    pub input_max: f64,
    pub output_min: f64,
    pub output_max: f64,
}

impl CalibrationRange {
    pub const fn new(input_min: f64, input_max: f64, output_min: f64, output_max: f64) -> Self {
        Self {
            input_min,
            input_max,
            output_min,
            output_max,
        }
    }

    pub fn input_span(&self) -> f64 {
        self.input_max - self.input_min
    }

    /// The full scale of the output signal, against which errors are normalised
    pub fn output_span(&self) -> f64 {
        self.output_max - self.output_min
    }

    /// Check both axes have a positive, finite span
    ///
    /// # Errors
    /// Returns [`InvalidRangeError::InvalidRange`] naming the first offending axis.
    pub fn validate(&self) -> Result<(), InvalidRangeError> {
        check_axis(Axis::Input, self.input_min, self.input_max)?;
        check_axis(Axis::Output, self.output_min, self.output_max)
    }
}

fn check_axis(axis: Axis, min: f64, max: f64) -> Result<(), InvalidRangeError> {
    // `min < max` is false for NaN on either side, infinities are caught separately. The span
    // itself must also be finite, interpolation and full-scale errors divide through it.
    if min.is_finite() && max.is_finite() && min < max && (max - min).is_finite() {
        Ok(())
    } else {
        Err(InvalidRangeError::InvalidRange { axis, min, max })
    }
}

/// Everything needed to run one calibration check
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    pub range: CalibrationRange,
    /// Maximum allowed error, in percent of the output span
    pub tolerance_percent: f64,
    pub point_count: usize,
    #[serde(default)]
    pub noise_model: NoiseModel,
}

impl CalibrationConfig {
    pub fn new(range: CalibrationRange, tolerance_percent: f64, point_count: usize) -> Self {
        Self {
            range,
            tolerance_percent,
            point_count,
            noise_model: NoiseModel::default(),
        }
    }

    #[must_use]
    pub const fn with_noise_model(mut self, noise_model: NoiseModel) -> Self {
        self.noise_model = noise_model;
        self
    }

    /// # Errors
    /// Returns an error if the range is not valid, the tolerance is negative or not finite, or
    /// no points were requested.
    pub fn validate(&self) -> Result<(), InvalidRangeError> {
        self.range.validate()?;
        if !(self.tolerance_percent.is_finite() && self.tolerance_percent >= 0.0) {
            return Err(InvalidRangeError::InvalidTolerance(self.tolerance_percent));
        }
        if self.point_count == 0 {
            return Err(InvalidRangeError::InvalidPointCount);
        }
        Ok(())
    }
}

impl From<CalibrationRange> for CalibrationConfig {
    fn from(range: CalibrationRange) -> Self {
        Self::new(range, DEFAULT_TOLERANCE_PERCENT, DEFAULT_POINT_COUNT)
    }
}
