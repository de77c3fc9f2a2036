use thiserror::Error;

use crate::calibration::Axis;

/// A calibration check was requested with parameters it cannot be evaluated for.
///
/// This is the only way [`evaluate`](crate::evaluate) can fail, and it is always reported before
/// any reading is generated.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum InvalidRangeError {
    #[error("invalid {axis} range: minimum {min} must be finite and below maximum {max}")]
    InvalidRange { axis: Axis, min: f64, max: f64 },

    #[error("tolerance must be a non-negative percentage, got {0}")]
    InvalidTolerance(f64),

    #[error("at least one measurement point is required")]
    InvalidPointCount,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),

    #[error("unknown sensor preset: {0}")]
    UnknownPreset(String),

    #[error("no value for `{0}` and no sensor preset to take it from")]
    MissingBound(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
