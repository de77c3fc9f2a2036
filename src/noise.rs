//! Simulated measurement error
//!
//! Synthetic readings are produced in two steps. A [`NoiseSource`] yields a unit draw
//! $u \in [-1, 1]$, and a [`NoiseModel`] turns that draw into a perturbed reading of the ideal
//! output $y$:
//!
//! - [`NoiseModel::Additive`]: $y + u / 100$, an absolute offset of at most 0.01 output units
//! - [`NoiseModel::Multiplicative`]: $y \left(1 + u t / 100\right)$, a relative error of at most
//!   the tolerance $t$ percent of the reading
//!
//! Keeping the two apart lets tests swap the random source for [`ZeroNoise`] or [`FixedNoise`]
//! and assert exact readings.
use std::fmt;
use std::str::FromStr;

use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::{Distribution, Uniform};
use rand_isaac::Isaac64Rng;
use serde::{Deserialize, Serialize};

/// How a unit draw perturbs an ideal output value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    #[default]
    Additive,
    Multiplicative,
}

impl NoiseModel {
    /// Apply the unit draw `unit` to `ideal`
    pub fn perturb(self, ideal: f64, unit: f64, tolerance_percent: f64) -> f64 {
        match self {
            Self::Additive => ideal + unit / 100.,
            Self::Multiplicative => ideal * (1. + unit * tolerance_percent / 100.),
        }
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Additive => write!(f, "additive"),
            Self::Multiplicative => write!(f, "multiplicative"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown noise model `{0}`, expected `additive` or `multiplicative`")]
pub struct UnknownNoiseModel(String);

impl FromStr for NoiseModel {
    type Err = UnknownNoiseModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" | "absolute" => Ok(Self::Additive),
            "multiplicative" | "relative" => Ok(Self::Multiplicative),
            _ => Err(UnknownNoiseModel(s.to_owned())),
        }
    }
}

/// A source of unit draws in `[-1, 1]`
pub trait NoiseSource {
    fn draw(&mut self) -> f64;
}

impl<N: NoiseSource + ?Sized> NoiseSource for &mut N {
    fn draw(&mut self) -> f64 {
        (**self).draw()
    }
}

/// Uniformly distributed draws from a random number generator
pub struct UniformNoise<R> {
    rng: R,
    distribution: Uniform<f64>,
}

impl<R: Rng> UniformNoise<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            distribution: Uniform::new_inclusive(-1., 1.),
        }
    }
}

impl UniformNoise<Isaac64Rng> {
    /// Reproducible noise, the same seed always yields the same sequence of draws
    pub fn seeded(seed: u64) -> Self {
        Self::new(Isaac64Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(Isaac64Rng::from_entropy())
    }
}

impl<R: Rng> NoiseSource for UniformNoise<R> {
    fn draw(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}

/// A perfect instrument
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn draw(&mut self) -> f64 {
        0.
    }
}

/// Replays a fixed sequence of draws, starting over once it is exhausted
///
/// An empty sequence behaves like [`ZeroNoise`].
#[derive(Clone, Debug, Default)]
pub struct FixedNoise {
    draws: Vec<f64>,
    cursor: usize,
}

impl FixedNoise {
    pub fn new(draws: impl Into<Vec<f64>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: 0,
        }
    }
}

impl NoiseSource for FixedNoise {
    fn draw(&mut self) -> f64 {
        let Some(&value) = self.draws.get(self.cursor) else {
            return 0.;
        };
        self.cursor = (self.cursor + 1) % self.draws.len();
        value
    }
}
