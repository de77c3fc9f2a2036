//! Layered settings for a calibration check
//!
//! Values are resolved from, lowest priority first, the built-in defaults, the bounds of the
//! selected sensor preset, a TOML settings file and finally explicit overrides (usually command
//! line flags). A settings file looks like
//!
//! ```toml
//! sensor = "rtd"
//! tolerance_percent = 0.5
//! point_count = 11
//! noise_model = "multiplicative"
//! seed = 40
//!
//! [[preset]]
//! key = "flow"
//! name = "Flow meter"
//! input_min = 0.0
//! input_max = 50.0
//! input_unit = "m³/h"
//! output_min = 4.0
//! output_max = 20.0
//! output_unit = "mA"
//! ```
use std::fs;
use std::path::Path;

use rand_isaac::Isaac64Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{
    CalibrationConfig, CalibrationRange, DEFAULT_POINT_COUNT, DEFAULT_TOLERANCE_PERCENT,
};
use crate::evaluator::{evaluate, CalibrationReport};
use crate::noise::{NoiseModel, UniformNoise};
use crate::presets::{PresetCatalog, SensorPreset};
use crate::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckSettings {
    /// Key or name of the sensor preset supplying default bounds
    pub sensor: Option<String>,
    pub input_min: Option<f64>,
    pub input_max: Option<f64>,
    pub output_min: Option<f64>,
    pub output_max: Option<f64>,
    pub tolerance_percent: Option<f64>,
    pub point_count: Option<usize>,
    pub noise_model: Option<NoiseModel>,
    /// Seed for reproducible noise, fresh entropy is used when absent
    pub seed: Option<u64>,
    /// Additional presets, replacing built-ins with the same key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preset: Vec<SensorPreset>,
}

impl CheckSettings {
    /// # Errors
    /// Returns an error if `contents` is not valid TOML or contains unknown keys.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(?path, "reading settings file");
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Layer `overrides` on top of `self`
    ///
    /// Every value set in `overrides` wins. Presets from both layers are kept, those in
    /// `overrides` taking precedence on a key clash.
    #[must_use]
    pub fn merge(mut self, overrides: Self) -> Self {
        self.preset.extend(overrides.preset);
        Self {
            sensor: overrides.sensor.or(self.sensor),
            input_min: overrides.input_min.or(self.input_min),
            input_max: overrides.input_max.or(self.input_max),
            output_min: overrides.output_min.or(self.output_min),
            output_max: overrides.output_max.or(self.output_max),
            tolerance_percent: overrides.tolerance_percent.or(self.tolerance_percent),
            point_count: overrides.point_count.or(self.point_count),
            noise_model: overrides.noise_model.or(self.noise_model),
            seed: overrides.seed.or(self.seed),
            preset: self.preset,
        }
    }

    pub fn catalog(&self) -> PresetCatalog {
        let mut catalog = PresetCatalog::builtin();
        catalog.extend(self.preset.iter().cloned());
        catalog
    }

    /// Resolve into a validated configuration
    ///
    /// # Errors
    /// - [`Error::UnknownPreset`] if `sensor` names no known preset
    /// - [`Error::MissingBound`] if a bound is unset and there is no preset to supply it
    /// - [`Error::InvalidRange`] if the resolved configuration does not validate
    pub fn resolve(&self) -> Result<ResolvedCheck> {
        let sensor = match self.sensor.as_deref() {
            Some(query) => Some(
                self.catalog()
                    .find(query)
                    .cloned()
                    .ok_or_else(|| Error::UnknownPreset(query.to_owned()))?,
            ),
            None => None,
        };
        let defaults = sensor.as_ref().map(SensorPreset::range);

        let bound = |value: Option<f64>, pick: fn(&CalibrationRange) -> f64, name: &'static str| {
            value
                .or_else(|| defaults.as_ref().map(pick))
                .ok_or(Error::MissingBound(name))
        };
        let range = CalibrationRange::new(
            bound(self.input_min, |r| r.input_min, "input_min")?,
            bound(self.input_max, |r| r.input_max, "input_max")?,
            bound(self.output_min, |r| r.output_min, "output_min")?,
            bound(self.output_max, |r| r.output_max, "output_max")?,
        );

        let config = CalibrationConfig::new(
            range,
            self.tolerance_percent.unwrap_or(DEFAULT_TOLERANCE_PERCENT),
            self.point_count.unwrap_or(DEFAULT_POINT_COUNT),
        )
        .with_noise_model(self.noise_model.unwrap_or_default());
        config.validate()?;

        Ok(ResolvedCheck {
            sensor,
            config,
            seed: self.seed,
        })
    }
}

/// A fully specified calibration check, ready to run
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCheck {
    pub sensor: Option<SensorPreset>,
    pub config: CalibrationConfig,
    pub seed: Option<u64>,
}

impl ResolvedCheck {
    pub fn noise(&self) -> UniformNoise<Isaac64Rng> {
        self.seed
            .map_or_else(UniformNoise::from_entropy, UniformNoise::seeded)
    }

    /// # Errors
    /// Only fails if the configuration was modified into an invalid state after resolution.
    pub fn evaluate(&self) -> Result<CalibrationReport> {
        Ok(evaluate(&self.config, &mut self.noise())?)
    }
}
