use std::collections::HashMap;

use tempdir::TempDir;

use calibration_check::export::{self, Delimiter};
use calibration_check::presets::PresetCatalog;
use calibration_check::{CalibrationConfig, CalibrationEvaluator, CalibrationReport};

fn rtd_report() -> calibration_check::Result<CalibrationReport> {
    let catalog = PresetCatalog::builtin();
    let rtd = catalog.find("rtd").expect("builtin preset");
    CalibrationEvaluator::seeded(40)
        .evaluate(&CalibrationConfig::from(rtd.range()))
        .map_err(Into::into)
}

fn read_back(path: &std::path::Path, delimiter: u8) -> Vec<HashMap<String, String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .unwrap();
    rdr.deserialize().map(Result::unwrap).collect()
}

#[test]
fn exported_files_round_trip_to_three_decimals() -> calibration_check::Result<()> {
    let tmp_dir = TempDir::new("exported_files_round_trip_to_three_decimals").unwrap();
    let path = tmp_dir.path().join(export::report_file_name(Some("rtd")));
    let report = rtd_report()?;

    export::write_csv_file(&report, &path, Delimiter::Semicolon)?;
    let rows = read_back(&path, b';');

    assert_eq!(rows.len(), report.points.len());
    for (row, point) in rows.iter().zip(&report.points) {
        for (column, value) in [
            ("input", point.ideal_input),
            ("output", point.ideal_output),
            ("forward", point.measured_forward),
            ("reverse", point.measured_reverse),
            ("forward_error_percent", point.error_forward_percent),
            ("reverse_error_percent", point.error_reverse_percent),
        ] {
            let cell = &row[column];
            let (_, decimals) = cell.split_once('.').expect("fixed point output");
            assert_eq!(decimals.len(), 3, "{column} = {cell}");
            let parsed: f64 = cell.parse().unwrap();
            approx::assert_abs_diff_eq!(parsed, value, epsilon = 5e-4 + 1e-9);
        }
    }
    Ok(())
}

#[test]
fn comma_files_read_back_with_commas() -> calibration_check::Result<()> {
    let tmp_dir = TempDir::new("comma_files_read_back_with_commas").unwrap();
    let path = tmp_dir.path().join("report.csv");
    let report = rtd_report()?;

    export::write_csv_file(&report, &path, Delimiter::Comma)?;

    assert_eq!(read_back(&path, b',').len(), report.points.len());
    Ok(())
}

#[test]
fn writer_and_string_exports_agree() -> calibration_check::Result<()> {
    let report = rtd_report()?;
    let mut buffer = vec![];

    export::write_csv(&report, &mut buffer, Delimiter::Semicolon)?;

    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        export::to_csv_string(&report, Delimiter::Semicolon)?
    );
    Ok(())
}

#[test]
fn exporting_into_a_missing_directory_fails() {
    let tmp_dir = TempDir::new("exporting_into_a_missing_directory_fails").unwrap();
    let path = tmp_dir.path().join("missing").join("report.csv");
    let report = rtd_report().unwrap();

    assert!(export::write_csv_file(&report, &path, Delimiter::Semicolon).is_err());
}
