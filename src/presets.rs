use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationRange;
use crate::Result;

/// Default bounds and units for a family of instruments
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorPreset {
    /// Short identifier used on the command line and in file names
    pub key: Cow<'static, str>,
    pub name: Cow<'static, str>,
    pub input_min: f64,
    pub input_max: f64,
    pub input_unit: Cow<'static, str>,
    pub output_min: f64,
    pub output_max: f64,
    pub output_unit: Cow<'static, str>,
}

impl SensorPreset {
    pub const fn range(&self) -> CalibrationRange {
        CalibrationRange::new(
            self.input_min,
            self.input_max,
            self.output_min,
            self.output_max,
        )
    }

    fn matches(&self, query: &str) -> bool {
        self.key.eq_ignore_ascii_case(query) || self.name.eq_ignore_ascii_case(query)
    }
}

pub static BUILTIN_PRESETS: [SensorPreset; 4] = [
    SensorPreset {
        key: Cow::Borrowed("rtd"),
        name: Cow::Borrowed("Resistance temperature detector"),
        input_min: -196.,
        input_max: 600.,
        input_unit: Cow::Borrowed("°C"),
        output_min: 4.,
        output_max: 20.,
        output_unit: Cow::Borrowed("mA"),
    },
    SensorPreset {
        key: Cow::Borrowed("pressure-gauge"),
        name: Cow::Borrowed("Pressure gauge"),
        input_min: 0.25,
        input_max: 2.5,
        input_unit: Cow::Borrowed("MPa"),
        output_min: 0.,
        output_max: 5.,
        output_unit: Cow::Borrowed("mA"),
    },
    SensorPreset {
        key: Cow::Borrowed("level"),
        name: Cow::Borrowed("Level sensor"),
        input_min: 0.,
        input_max: 100.,
        input_unit: Cow::Borrowed("m"),
        output_min: 0.,
        output_max: 20.,
        output_unit: Cow::Borrowed("mA"),
    },
    SensorPreset {
        key: Cow::Borrowed("thermocouple"),
        name: Cow::Borrowed("Thermocouple"),
        input_min: 313.,
        input_max: 1373.,
        input_unit: Cow::Borrowed("K"),
        output_min: 0.,
        output_max: 10.,
        output_unit: Cow::Borrowed("V"),
    },
];

#[derive(Deserialize)]
struct PresetFile {
    #[serde(default)]
    preset: Vec<SensorPreset>,
}

/// The set of presets available to a caller, built-ins first
#[derive(Clone, Debug, PartialEq)]
pub struct PresetCatalog {
    presets: Vec<SensorPreset>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        Self {
            presets: BUILTIN_PRESETS.to_vec(),
        }
    }

    /// Built-in presets extended by the `[[preset]]` tables of a TOML document
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML or a preset is incomplete.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: PresetFile = toml::from_str(contents)?;
        let mut catalog = Self::builtin();
        catalog.extend(file.preset);
        Ok(catalog)
    }

    /// Find a preset by key or display name, ignoring ASCII case
    pub fn find(&self, query: &str) -> Option<&SensorPreset> {
        let query = query.trim();
        self.presets.iter().find(|preset| preset.matches(query))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorPreset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Extend<SensorPreset> for PresetCatalog {
    /// Presets sharing a key with an existing entry replace it in place
    fn extend<T: IntoIterator<Item = SensorPreset>>(&mut self, iter: T) {
        for preset in iter {
            match self
                .presets
                .iter()
                .position(|existing| existing.key.eq_ignore_ascii_case(&preset.key))
            {
                Some(index) => self.presets[index] = preset,
                None => self.presets.push(preset),
            }
        }
    }
}
