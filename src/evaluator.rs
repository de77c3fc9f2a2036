//! Synthesis and evaluation of calibration readings
//!
//! A calibration check walks the instrument's input range in `point_count` evenly spaced steps.
//! At each step the ideal output is read twice, once on the rising (forward) pass and once on the
//! falling (reverse) pass, and each reading is perturbed by the configured [`NoiseModel`].
//!
//! The error of a reading is expressed in percent of full scale
//!
//! $$
//!     e = 100 \frac{\left|y_{measured} - y_{ideal}\right|}{y_{max} - y_{min}},
//! $$
//!
//! and the instrument passes when no reading on either pass exceeds the tolerance.
//!
//! [`NoiseModel`]: crate::noise::NoiseModel
use std::fmt;

use itertools::Itertools;
use rand_isaac::Isaac64Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calibration::CalibrationConfig;
use crate::error::InvalidRangeError;
use crate::noise::{NoiseSource, UniformNoise};

/// A single calibration point with its forward and reverse readings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    pub ideal_input: f64,
    pub ideal_output: f64,
    pub measured_forward: f64,
    pub measured_reverse: f64,
    pub error_forward_percent: f64,
    pub error_reverse_percent: f64,
}

impl MeasurementPoint {
    fn measure(
        ideal_input: f64,
        ideal_output: f64,
        measured_forward: f64,
        measured_reverse: f64,
        output_span: f64,
    ) -> Self {
        Self {
            ideal_input,
            ideal_output,
            measured_forward,
            measured_reverse,
            error_forward_percent: full_scale_error(measured_forward, ideal_output, output_span),
            error_reverse_percent: full_scale_error(measured_reverse, ideal_output, output_span),
        }
    }

    /// Whether neither pass exceeds `tolerance_percent`
    pub fn is_within(&self, tolerance_percent: f64) -> bool {
        self.error_forward_percent <= tolerance_percent
            && self.error_reverse_percent <= tolerance_percent
    }

    pub fn max_error_percent(&self) -> f64 {
        self.error_forward_percent.max(self.error_reverse_percent)
    }
}

fn full_scale_error(measured: f64, ideal: f64, output_span: f64) -> f64 {
    100. * (measured - ideal).abs() / output_span
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS: instrument is fit for service"),
            Self::Fail => write!(f, "FAIL: instrument is not fit for service"),
        }
    }
}

/// The outcome of one calibration check
///
/// Points are ordered by ascending ideal input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub points: Vec<MeasurementPoint>,
    pub is_within_tolerance: bool,
    pub tolerance_percent: f64,
}

impl CalibrationReport {
    pub const fn verdict(&self) -> Verdict {
        if self.is_within_tolerance {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    /// The largest error on either pass, `None` for an empty report
    pub fn max_error_percent(&self) -> Option<f64> {
        self.points
            .iter()
            .map(MeasurementPoint::max_error_percent)
            .reduce(f64::max)
    }

    /// The points at which either pass exceeds the tolerance
    pub fn failing_points(&self) -> impl Iterator<Item = &MeasurementPoint> + '_ {
        self.points
            .iter()
            .filter(|point| !point.is_within(self.tolerance_percent))
    }
}

/// `count` evenly spaced values covering `[min, max]` inclusively
///
/// The final value is pinned to `max` so rounding in the step cannot move the endpoint. A single
/// value is just `min`.
#[allow(clippy::cast_precision_loss)]
fn ideal_axis(min: f64, max: f64, count: usize) -> impl ExactSizeIterator<Item = f64> {
    let last = count.saturating_sub(1);
    (0..count).map(move |ii| match ii {
        0 => min,
        ii if ii == last => max,
        ii => min + ii as f64 * (max - min) / last as f64,
    })
}

/// Run a calibration check, drawing simulated errors from `noise`
///
/// For every point the forward draw is taken before the reverse draw, so a deterministic source
/// fully determines the report.
///
/// # Errors
/// Fails without drawing any noise if `config` does not validate.
pub fn evaluate<N: NoiseSource + ?Sized>(
    config: &CalibrationConfig,
    noise: &mut N,
) -> Result<CalibrationReport, InvalidRangeError> {
    config.validate()?;

    let range = &config.range;
    let tolerance = config.tolerance_percent;
    let output_span = range.output_span();
    debug!(
        ?range,
        tolerance_percent = tolerance,
        point_count = config.point_count,
        noise_model = %config.noise_model,
        "evaluating calibration check"
    );

    let points = ideal_axis(range.input_min, range.input_max, config.point_count)
        .zip_eq(ideal_axis(
            range.output_min,
            range.output_max,
            config.point_count,
        ))
        .map(|(ideal_input, ideal_output)| {
            let forward = config
                .noise_model
                .perturb(ideal_output, noise.draw(), tolerance);
            let reverse = config
                .noise_model
                .perturb(ideal_output, noise.draw(), tolerance);
            MeasurementPoint::measure(ideal_input, ideal_output, forward, reverse, output_span)
        })
        .collect::<Vec<_>>();

    let mut is_within_tolerance = true;
    for point in points.iter().filter(|point| !point.is_within(tolerance)) {
        warn!(
            ideal_input = point.ideal_input,
            error_forward_percent = point.error_forward_percent,
            error_reverse_percent = point.error_reverse_percent,
            tolerance_percent = tolerance,
            "calibration point out of tolerance"
        );
        is_within_tolerance = false;
    }

    let report = CalibrationReport {
        points,
        is_within_tolerance,
        tolerance_percent: tolerance,
    };
    debug!(
        verdict = ?report.verdict(),
        max_error_percent = report.max_error_percent(),
        "calibration check complete"
    );
    Ok(report)
}

/// Runs calibration checks against an owned noise source
pub struct CalibrationEvaluator<N> {
    noise: N,
}

impl<N: NoiseSource> CalibrationEvaluator<N> {
    pub const fn new(noise: N) -> Self {
        Self { noise }
    }

    /// # Errors
    /// See [`evaluate`].
    pub fn evaluate(
        &mut self,
        config: &CalibrationConfig,
    ) -> Result<CalibrationReport, InvalidRangeError> {
        evaluate(config, &mut self.noise)
    }

    pub fn into_inner(self) -> N {
        self.noise
    }
}

impl CalibrationEvaluator<UniformNoise<Isaac64Rng>> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(UniformNoise::seeded(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(UniformNoise::from_entropy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Axis, CalibrationRange};
    use crate::noise::{FixedNoise, NoiseModel, ZeroNoise};

    fn current_loop(tolerance_percent: f64, point_count: usize) -> CalibrationConfig {
        CalibrationConfig::new(
            CalibrationRange::new(0., 100., 4., 20.),
            tolerance_percent,
            point_count,
        )
    }

    #[test]
    fn ideal_axes_are_evenly_spaced_and_exact_at_the_ends() {
        let report = evaluate(&current_loop(1., 6), &mut ZeroNoise).unwrap();

        let inputs = [0., 20., 40., 60., 80., 100.];
        let outputs = [4., 7.2, 10.4, 13.6, 16.8, 20.];
        assert_eq!(report.points.len(), 6);
        for ((point, input), output) in report.points.iter().zip(inputs).zip(outputs) {
            approx::assert_relative_eq!(point.ideal_input, input);
            approx::assert_relative_eq!(point.ideal_output, output);
        }
        assert_eq!(report.points[0].ideal_input, 0.);
        assert_eq!(report.points[5].ideal_input, 100.);
        assert_eq!(report.points[5].ideal_output, 20.);
    }

    #[test]
    fn zero_noise_passes_with_zero_error() {
        let report = evaluate(&current_loop(1., 6), &mut ZeroNoise).unwrap();

        assert!(report.is_within_tolerance);
        assert_eq!(report.verdict(), Verdict::Pass);
        for point in &report.points {
            assert_eq!(point.error_forward_percent, 0.);
            assert_eq!(point.error_reverse_percent, 0.);
            assert_eq!(point.measured_forward, point.ideal_output);
            assert_eq!(point.measured_reverse, point.ideal_output);
        }
        assert_eq!(report.max_error_percent(), Some(0.));
        assert_eq!(report.failing_points().count(), 0);
    }

    #[test]
    fn a_single_point_sits_at_the_range_minimum() {
        let report = evaluate(&current_loop(1., 1), &mut ZeroNoise).unwrap();

        assert_eq!(report.points.len(), 1);
        assert_eq!(report.points[0].ideal_input, 0.);
        assert_eq!(report.points[0].ideal_output, 4.);
        assert!(report.points[0].error_forward_percent.is_finite());
    }

    #[test]
    fn two_points_cover_both_ends() {
        let report = evaluate(&current_loop(1., 2), &mut ZeroNoise).unwrap();

        let inputs = report.points.iter().map(|p| p.ideal_input).collect::<Vec<_>>();
        assert_eq!(inputs, vec![0., 100.]);
    }

    #[test]
    fn forward_draw_precedes_reverse_draw() {
        let mut noise = FixedNoise::new([1., -1.]);
        let report = evaluate(&current_loop(1., 1), &mut noise).unwrap();

        let point = report.points[0];
        approx::assert_relative_eq!(point.measured_forward, 4.01);
        approx::assert_relative_eq!(point.measured_reverse, 3.99);
        // 0.01 of a 16 unit span
        approx::assert_relative_eq!(point.error_forward_percent, 0.0625, max_relative = 1e-9);
        approx::assert_relative_eq!(point.error_reverse_percent, 0.0625, max_relative = 1e-9);
    }

    #[test]
    fn errors_are_percent_of_full_scale_not_of_reading() {
        // An offset of 0.01 on a unit span is 1% of full scale wherever it happens
        let config = CalibrationConfig::new(CalibrationRange::new(0., 1., 100., 101.), 5., 1);
        let report = evaluate(&config, &mut FixedNoise::new([1.])).unwrap();

        approx::assert_relative_eq!(
            report.points[0].error_forward_percent,
            1.,
            max_relative = 1e-9
        );
    }

    #[test]
    fn error_equal_to_tolerance_still_passes() {
        let config = CalibrationConfig::new(CalibrationRange::new(0., 1., 0., 1.), 1., 1);
        let report = evaluate(&config, &mut FixedNoise::new([1.])).unwrap();

        assert_eq!(report.points[0].error_forward_percent, 1.);
        assert!(report.is_within_tolerance);
    }

    #[test]
    fn one_bad_reverse_reading_fails_the_instrument() {
        // Additive noise of a full unit draw on a 1 unit span is a 1% error
        let config = CalibrationConfig::new(CalibrationRange::new(0., 10., 0., 1.), 0.5, 3);
        let mut noise = FixedNoise::new([0., 0., 0., 1., 0., 0.]);
        let report = evaluate(&config, &mut noise).unwrap();

        assert!(!report.is_within_tolerance);
        assert_eq!(report.verdict(), Verdict::Fail);
        let failing = report.failing_points().collect::<Vec<_>>();
        assert_eq!(failing.len(), 1);
        approx::assert_relative_eq!(failing[0].ideal_input, 5.);
        assert_eq!(failing[0].error_forward_percent, 0.);
        assert!(failing[0].error_reverse_percent > 0.5);
    }

    #[test]
    fn multiplicative_noise_grows_with_the_reading() {
        let config = current_loop(1., 6).with_noise_model(NoiseModel::Multiplicative);
        let report = evaluate(&config, &mut FixedNoise::new([1.])).unwrap();

        // 1% of a 4 mA reading is 0.25% of the 16 mA span, 1% of 20 mA is 1.25%
        let first = report.points[0];
        let last = report.points[5];
        approx::assert_relative_eq!(first.error_forward_percent, 0.25, max_relative = 1e-9);
        approx::assert_relative_eq!(last.error_forward_percent, 1.25, max_relative = 1e-9);
        assert!(!report.is_within_tolerance);
    }

    #[test]
    fn inverted_range_fails_before_drawing_noise() {
        let config = CalibrationConfig::new(CalibrationRange::new(10., 5., 4., 20.), 1., 6);
        let mut noise = FixedNoise::new([1., 2.]);

        let result = evaluate(&config, &mut noise);

        assert_eq!(
            result,
            Err(InvalidRangeError::InvalidRange {
                axis: Axis::Input,
                min: 10.,
                max: 5.
            })
        );
        approx::assert_relative_eq!(noise.draw(), 1.);
    }

    #[test]
    fn overflowing_spans_fail_instead_of_producing_nan() {
        let config = CalibrationConfig::new(
            CalibrationRange::new(-1e308, 1e308, -1e308, 1e308),
            1.,
            4,
        );
        let result = evaluate(&config, &mut ZeroNoise);
        assert!(matches!(
            result,
            Err(InvalidRangeError::InvalidRange {
                axis: Axis::Input,
                ..
            })
        ));
    }

    #[test]
    fn very_wide_ranges_stay_ordered_and_exact() {
        let config = CalibrationConfig::new(
            CalibrationRange::new(-8e307, 8e307, -8e307, 8e307),
            1.,
            4,
        );
        let report = evaluate(&config, &mut ZeroNoise).unwrap();

        assert!(report.is_within_tolerance);
        for pair in report.points.windows(2) {
            assert!(pair[0].ideal_input < pair[1].ideal_input);
        }
        for point in &report.points {
            assert!(point.ideal_input.is_finite());
            assert_eq!(point.error_forward_percent, 0.);
        }
    }

    #[test]
    fn seeded_evaluators_reproduce_reports() {
        let config = current_loop(1., 11);
        let first = CalibrationEvaluator::seeded(40).evaluate(&config).unwrap();
        let second = CalibrationEvaluator::seeded(40).evaluate(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn evaluator_keeps_drawing_from_its_source() {
        let config = current_loop(1., 1);
        let mut evaluator = CalibrationEvaluator::new(FixedNoise::new([0., 0., 1., 1.]));

        let first = evaluator.evaluate(&config).unwrap();
        let second = evaluator.evaluate(&config).unwrap();

        assert_eq!(first.points[0].error_forward_percent, 0.);
        assert!(second.points[0].error_forward_percent > 0.);
    }

    #[test]
    fn verdicts_render_as_banners() {
        assert_eq!(
            Verdict::Pass.to_string(),
            "PASS: instrument is fit for service"
        );
        assert_eq!(
            Verdict::Fail.to_string(),
            "FAIL: instrument is not fit for service"
        );
    }
}
