//! calibration-check - simulate a calibration check of a sensor
//!
//! Resolves the instrument range from a sensor preset, a settings file and flags, synthesises
//! forward and reverse readings, then prints the table and verdict and optionally exports it.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use calibration_check::export::{self, Delimiter};
use calibration_check::presets::PresetCatalog;
use calibration_check::settings::{CheckSettings, ResolvedCheck};
use calibration_check::{CalibrationReport, NoiseModel, Verdict};

#[derive(Parser, Debug)]
#[command(name = "calibration-check")]
#[command(version)]
#[command(about = "Simulate a sensor calibration check against a full-scale tolerance")]
struct Cli {
    /// Sensor preset supplying default bounds (see --list-presets)
    #[arg(short, long, env = "CALIBRATION_CHECK_SENSOR")]
    sensor: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    input_min: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    input_max: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    output_min: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    output_max: Option<f64>,

    /// Maximum allowed error in percent of the output span [default: 1.0]
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Number of calibration points [default: 6]
    #[arg(short = 'n', long)]
    points: Option<usize>,

    /// How simulated errors are applied: additive or multiplicative [default: additive]
    #[arg(long)]
    noise: Option<NoiseModel>,

    /// Seed for reproducible readings
    #[arg(long)]
    seed: Option<u64>,

    /// TOML settings file, overridden by flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Export the table to this file, or into this directory under a generated name
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Field separator for --csv: semicolon or comma
    #[arg(long, default_value_t = Delimiter::Semicolon)]
    delimiter: Delimiter,

    /// Print the available sensor presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Verbose logging
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> CheckSettings {
        CheckSettings {
            sensor: self.sensor.clone(),
            input_min: self.input_min,
            input_max: self.input_max,
            output_min: self.output_min,
            output_max: self.output_max,
            tolerance_percent: self.tolerance,
            point_count: self.points,
            noise_model: self.noise,
            seed: self.seed,
            preset: vec![],
        }
    }

    fn settings(&self) -> Result<CheckSettings> {
        let file = match &self.config {
            Some(path) => CheckSettings::from_file(path)
                .with_context(|| format!("failed to load settings from {}", path.display()))?,
            None => CheckSettings::default(),
        };
        Ok(file.merge(self.overrides()))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("calibration_check={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli) {
        Ok(Verdict::Pass) => ExitCode::SUCCESS,
        Ok(Verdict::Fail) => ExitCode::from(2),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Verdict> {
    let settings = cli.settings()?;

    if cli.list_presets {
        print!("{}", render_presets(&settings.catalog()));
        return Ok(Verdict::Pass);
    }

    let check = settings
        .resolve()
        .context("invalid calibration parameters")?;
    let report = check.evaluate()?;

    print!("{}", render_table(&report, &check));
    println!();
    println!("{}", report.verdict());

    if let Some(path) = &cli.csv {
        let path = export_path(path, &check);
        export::write_csv_file(&report, &path, cli.delimiter)
            .with_context(|| format!("failed to export report to {}", path.display()))?;
        info!(path = %path.display(), "report exported");
    }

    Ok(report.verdict())
}

fn export_path(path: &Path, check: &ResolvedCheck) -> PathBuf {
    if path.is_dir() {
        let key = check.sensor.as_ref().map(|sensor| &*sensor.key);
        path.join(export::report_file_name(key))
    } else {
        path.to_path_buf()
    }
}

fn render_presets(catalog: &PresetCatalog) -> String {
    catalog
        .iter()
        .map(|preset| {
            format!(
                "{:<16} {:<34} {} .. {} {} -> {} .. {} {}\n",
                preset.key,
                preset.name,
                preset.input_min,
                preset.input_max,
                preset.input_unit,
                preset.output_min,
                preset.output_max,
                preset.output_unit
            )
        })
        .collect()
}

/// The report as an aligned text table, columns in export order
fn render_table(report: &CalibrationReport, check: &ResolvedCheck) -> String {
    let (input_unit, output_unit) = check.sensor.as_ref().map_or(("", ""), |sensor| {
        (&*sensor.input_unit, &*sensor.output_unit)
    });
    let with_unit = |label: &str, unit: &str| {
        if unit.is_empty() {
            label.to_owned()
        } else {
            format!("{label} [{unit}]")
        }
    };
    let header = vec![
        with_unit("input", input_unit),
        with_unit("output", output_unit),
        with_unit("forward", output_unit),
        with_unit("reverse", output_unit),
        "forward err %".to_owned(),
        "reverse err %".to_owned(),
    ];
    let rows = report
        .points
        .iter()
        .map(|point| {
            [
                point.ideal_input,
                point.ideal_output,
                point.measured_forward,
                point.measured_reverse,
                point.error_forward_percent,
                point.error_reverse_percent,
            ]
            .iter()
            .map(|value| format!("{value:.3}"))
            .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let widths = header
        .iter()
        .enumerate()
        .map(|(ii, label)| {
            rows.iter()
                .filter_map(|row| row.get(ii))
                .chain(std::iter::once(label))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();

    std::iter::once(&header)
        .chain(rows.iter())
        .map(|row| {
            row.iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:>width$}"))
                .join("  ")
                + "\n"
        })
        .collect()
}
