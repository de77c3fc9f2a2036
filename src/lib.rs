#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod calibration;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod noise;
pub mod presets;
pub mod settings;

pub use calibration::{Axis, CalibrationConfig, CalibrationRange};
pub use error::{Error, InvalidRangeError};
pub use evaluator::{evaluate, CalibrationEvaluator, CalibrationReport, MeasurementPoint, Verdict};
pub use noise::{FixedNoise, NoiseModel, NoiseSource, UniformNoise, ZeroNoise};

pub type Result<T> = ::std::result::Result<T, Error>;
