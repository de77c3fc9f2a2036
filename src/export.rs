//! Delimited text export of calibration reports
//!
//! One header row, then one row per point in report order:
//!
//! | column | contents |
//! |---|---|
//! | `input` | ideal input |
//! | `output` | ideal output |
//! | `forward` | forward pass reading |
//! | `reverse` | reverse pass reading |
//! | `forward_error_percent` | forward pass error, percent of full scale |
//! | `reverse_error_percent` | reverse pass error, percent of full scale |
//!
//! All numbers are written with three decimal places.
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::evaluator::{CalibrationReport, MeasurementPoint};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Semicolon,
    Comma,
}

impl Delimiter {
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Semicolon => b';',
            Self::Comma => b',',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semicolon => write!(f, "semicolon"),
            Self::Comma => write!(f, "comma"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown delimiter `{0}`, expected `semicolon` or `comma`")]
pub struct UnknownDelimiter(String);

impl FromStr for Delimiter {
    type Err = UnknownDelimiter;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semicolon" | ";" => Ok(Self::Semicolon),
            "comma" | "," => Ok(Self::Comma),
            _ => Err(UnknownDelimiter(s.to_owned())),
        }
    }
}

#[derive(Serialize)]
struct Row {
    input: String,
    output: String,
    forward: String,
    reverse: String,
    forward_error_percent: String,
    reverse_error_percent: String,
}

fn fixed(value: f64) -> String {
    format!("{value:.3}")
}

impl From<&MeasurementPoint> for Row {
    fn from(point: &MeasurementPoint) -> Self {
        Self {
            input: fixed(point.ideal_input),
            output: fixed(point.ideal_output),
            forward: fixed(point.measured_forward),
            reverse: fixed(point.measured_reverse),
            forward_error_percent: fixed(point.error_forward_percent),
            reverse_error_percent: fixed(point.error_reverse_percent),
        }
    }
}

fn write_rows<W: io::Write>(report: &CalibrationReport, wtr: &mut csv::Writer<W>) -> Result<()> {
    for point in &report.points {
        wtr.serialize(Row::from(point))?;
    }
    wtr.flush()?;
    Ok(())
}

fn writer_builder(delimiter: Delimiter) -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.delimiter(delimiter.as_byte()).has_headers(true);
    builder
}

/// Write `report` to any writer
///
/// # Errors
/// Returns an error if writing to `writer` fails.
pub fn write_csv<W: io::Write>(
    report: &CalibrationReport,
    writer: W,
    delimiter: Delimiter,
) -> Result<()> {
    let mut wtr = writer_builder(delimiter).from_writer(writer);
    write_rows(report, &mut wtr)
}

/// # Errors
/// Returns an error only if the underlying buffer cannot be recovered from the writer.
pub fn to_csv_string(report: &CalibrationReport, delimiter: Delimiter) -> Result<String> {
    let mut wtr = writer_builder(delimiter).from_writer(vec![]);
    write_rows(report, &mut wtr)?;
    let bytes = wtr
        .into_inner()
        .map_err(|err| Error::Io(io::Error::new(err.error().kind(), err.error().to_string())))?;
    String::from_utf8(bytes)
        .map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_csv_file(
    report: &CalibrationReport,
    path: &Path,
    delimiter: Delimiter,
) -> Result<()> {
    let mut wtr = writer_builder(delimiter).from_path(path)?;
    write_rows(report, &mut wtr)?;
    info!(?path, rows = report.points.len(), "wrote calibration report");
    Ok(())
}

/// File name for the exported report of `sensor_key`
pub fn report_file_name(sensor_key: Option<&str>) -> String {
    sensor_key.map_or_else(
        || "calibration_report.csv".to_owned(),
        |key| format!("{key}_calibration_report.csv"),
    )
}
