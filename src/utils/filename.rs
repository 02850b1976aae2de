use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// `<output_dir>/<stem>-risk.parquet` for an input grid file.
pub fn risk_output_filename(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "grid".to_string());
    output_dir.join(format!("{}-risk.parquet", stem))
}

/// Default CSV name for a location series: `output/risk-{lat}_{lon}-{YYMMDD}.csv`
pub fn generate_default_location_filename(latitude: f64, longitude: f64) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100;

    let filename = format!(
        "risk-{:.2}_{:.2}-{:02}{:02}{:02}.csv",
        latitude,
        longitude,
        year,
        now.month(),
        now.day()
    );
    PathBuf::from("output").join(filename)
}
