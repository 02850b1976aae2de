use crate::error::{ProcessingError, Result};
use crate::models::{GridCoordinates, GridDataset, GridVariable};
use crate::readers::GridReader;
use chrono::NaiveDateTime;
use std::path::Path;

#[derive(Debug)]
pub struct GridStatistics {
    pub shape: (usize, usize, usize),
    pub time_range: (NaiveDateTime, NaiveDateTime),
    pub geographic_bounds: GeographicBounds,
    pub variables: Vec<VariableSummary>,
}

#[derive(Debug)]
pub struct GeographicBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug)]
pub struct VariableSummary {
    pub name: String,
    pub units: String,
    pub total_cells: usize,
    pub missing_cells: usize,
    pub infinite_cells: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub min_location: String,
    pub max_location: String,
}

impl VariableSummary {
    pub fn missing_percentage(&self) -> f64 {
        if self.total_cells == 0 {
            return 0.0;
        }
        (self.missing_cells as f64 / self.total_cells as f64) * 100.0
    }

    fn has_values(&self) -> bool {
        !self.mean.is_nan()
    }
}

pub struct GridAnalyzer;

impl GridAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_parquet(&self, path: &Path) -> Result<GridStatistics> {
        let dataset = GridReader::new().read_grid(path)?;
        self.analyze(&dataset)
    }

    pub fn analyze(&self, dataset: &GridDataset) -> Result<GridStatistics> {
        let coords = dataset.coords();
        let time_range = coords.time_range().ok_or_else(|| {
            ProcessingError::InvalidFormat("dataset has no time steps".to_string())
        })?;

        let (min_lat, max_lat) = axis_bounds(&coords.latitude);
        let (min_lon, max_lon) = axis_bounds(&coords.longitude);

        let variables = dataset
            .variables()
            .iter()
            .map(|v| summarize(v, coords))
            .collect();

        Ok(GridStatistics {
            shape: dataset.shape(),
            time_range,
            geographic_bounds: GeographicBounds {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
            },
            variables,
        })
    }
}

impl Default for GridAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn axis_bounds(axis: &[f64]) -> (f64, f64) {
    axis.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

fn summarize(variable: &GridVariable, coords: &GridCoordinates) -> VariableSummary {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut min_at = None;
    let mut max_at = None;
    let mut sum = 0.0;
    let mut count = 0usize;

    for ((t, i, j), &value) in variable.data.indexed_iter() {
        if !value.is_finite() {
            continue;
        }
        sum += value;
        count += 1;
        if value < min {
            min = value;
            min_at = Some((t, i, j));
        }
        if value > max {
            max = value;
            max_at = Some((t, i, j));
        }
    }

    let describe = |at: Option<(usize, usize, usize)>| match at {
        Some((t, i, j)) => format!(
            "{:.2}N {:.2}E ({})",
            coords.latitude[i], coords.longitude[j], coords.time[t]
        ),
        None => "No valid values".to_string(),
    };

    VariableSummary {
        name: variable.name.clone(),
        units: variable.units.clone(),
        total_cells: variable.data.len(),
        missing_cells: variable.missing_count(),
        infinite_cells: variable.infinite_count(),
        min: if count > 0 { min } else { f64::NAN },
        max: if count > 0 { max } else { f64::NAN },
        mean: if count > 0 { sum / count as f64 } else { f64::NAN },
        min_location: describe(min_at),
        max_location: describe(max_at),
    }
}

impl GridStatistics {
    pub fn summary(&self) -> String {
        let (n_time, n_lat, n_lon) = self.shape;
        let names: Vec<&str> = self.variables.iter().map(|v| v.name.as_str()).collect();

        format!(
            "Variables: {}\n\
            Grid: {} time steps x {} latitudes x {} longitudes\n\
            Time Range: {} to {}\n\
            Coverage: {:.2}..{:.2} lat, {:.2}..{:.2} lon",
            names.join(", "),
            n_time,
            n_lat,
            n_lon,
            self.time_range.0,
            self.time_range.1,
            self.geographic_bounds.min_lat,
            self.geographic_bounds.max_lat,
            self.geographic_bounds.min_lon,
            self.geographic_bounds.max_lon
        )
    }

    pub fn detailed_summary(&self) -> String {
        let mut out = format!("{}\n\nPer-variable statistics:", self.summary());

        for v in &self.variables {
            if v.has_values() {
                out.push_str(&format!(
                    "\n- {} [{}]: min {:.3} at {}, max {:.3} at {}, mean {:.3}, {:.1}% missing",
                    v.name,
                    v.units,
                    v.min,
                    v.min_location,
                    v.max,
                    v.max_location,
                    v.mean,
                    v.missing_percentage()
                ));
                if v.infinite_cells > 0 {
                    out.push_str(&format!(", {} infinite", v.infinite_cells));
                }
            } else {
                out.push_str(&format!("\n- {} [{}]: No valid values", v.name, v.units));
            }
        }
        out
    }
}
