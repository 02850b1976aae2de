use ndarray::Axis;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::{GridDataset, LocationQuery, LocationTimeseries, TimeseriesRow};
use crate::utils::coordinates::{align_longitude, indices_within, longitude_indices_within};

/// Buffered point extraction from a gridded dataset.
pub struct LocationExtractor;

impl LocationExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Average each requested variable over the cells inside the query's
    /// rectangular buffer, producing one row per time step.
    ///
    /// Missing cells are skipped when averaging; a time step with no valid
    /// cell yields NaN.
    pub fn extract(
        &self,
        dataset: &GridDataset,
        query: &LocationQuery,
        variables: &[&str],
    ) -> Result<LocationTimeseries> {
        query.validate()?;

        if variables.is_empty() {
            return Err(ProcessingError::Config(
                "At least one variable must be requested".to_string(),
            ));
        }
        dataset.require(variables)?;

        let coords = dataset.coords();
        let longitude = align_longitude(query.longitude, coords.uses_360_longitude());

        let lat_indices = indices_within(&coords.latitude, query.latitude, query.buffer);
        let lon_indices = longitude_indices_within(&coords.longitude, longitude, query.buffer);

        if lat_indices.is_empty() || lon_indices.is_empty() {
            return Err(ProcessingError::InvalidLocation(format!(
                "no grid cells within {} degrees of ({}, {})",
                query.buffer, query.latitude, query.longitude
            )));
        }

        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(variables.len());
        for name in variables {
            let window = dataset
                .data(name)?
                .select(Axis(1), &lat_indices)
                .select(Axis(2), &lon_indices);

            let means = window
                .outer_iter()
                .map(|slice| {
                    let (sum, count) = slice
                        .iter()
                        .filter(|v| !v.is_nan())
                        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
                    if count == 0 {
                        f64::NAN
                    } else {
                        sum / count as f64
                    }
                })
                .collect();
            columns.push(means);
        }

        let rows = coords
            .time
            .iter()
            .enumerate()
            .map(|(t, &time)| TimeseriesRow {
                time,
                values: columns.iter().map(|column| column[t]).collect(),
            })
            .collect();

        let cells_selected = lat_indices.len() * lon_indices.len();
        tracing::debug!(
            "extracted {} variable(s) over {} cell(s) at ({}, {})",
            variables.len(),
            cells_selected,
            query.latitude,
            query.longitude
        );

        Ok(LocationTimeseries {
            query: *query,
            cells_selected,
            columns: variables.iter().map(|v| v.to_string()).collect(),
            rows,
        })
    }
}

impl Default for LocationExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridCoordinates;
    use chrono::NaiveDate;
    use ndarray::Array3;

    fn weekly_grid() -> GridDataset {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = (0..7).map(|d| start + chrono::Duration::days(d)).collect();
        let coords = GridCoordinates::new(time, vec![-1.0, 0.0, 1.0], vec![35.0, 36.0, 37.0]);
        let mut dataset = GridDataset::new(coords).unwrap();
        dataset
            .insert_array(
                "malaria_risk_index",
                "1",
                Array3::from_shape_fn((7, 3, 3), |(t, i, j)| 0.1 * t as f64 + 0.01 * (i + j) as f64),
            )
            .unwrap();
        dataset
    }

    #[test]
    fn test_one_row_per_time_step() {
        let dataset = weekly_grid();
        let query = LocationQuery::new(0.0, 36.0, 1.0);
        let series = LocationExtractor::new()
            .extract(&dataset, &query, &["malaria_risk_index"])
            .unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(series.cells_selected, 9);
        assert_eq!(series.columns, vec!["malaria_risk_index".to_string()]);

        // Mean of 0.01 * (i + j) over the 3x3 block is 0.02
        let values = series.column("malaria_risk_index").unwrap();
        assert!((values[0] - 0.02).abs() < 1e-12);
        assert!((values[6] - 0.62).abs() < 1e-12);
    }

    #[test]
    fn test_small_buffer_selects_single_cell() {
        let dataset = weekly_grid();
        let query = LocationQuery::new(1.0, 37.0, 0.1);
        let series = LocationExtractor::new()
            .extract(&dataset, &query, &["malaria_risk_index"])
            .unwrap();

        assert_eq!(series.cells_selected, 1);
        assert!((series.rows[0].values[0] - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_bounds_location() {
        let dataset = weekly_grid();
        let query = LocationQuery::new(40.0, 36.0, 1.0);
        let err = LocationExtractor::new()
            .extract(&dataset, &query, &["malaria_risk_index"])
            .unwrap_err();
        assert!(matches!(err, ProcessingError::InvalidLocation(_)));
    }

    #[test]
    fn test_unknown_variable() {
        let dataset = weekly_grid();
        let query = LocationQuery::new(0.0, 36.0, 1.0);
        let err = LocationExtractor::new()
            .extract(&dataset, &query, &["precip_risk"])
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MissingVariable { .. }));
    }

    #[test]
    fn test_missing_cells_skipped() {
        let mut dataset = weekly_grid();
        let mut data = dataset.data("malaria_risk_index").unwrap().clone();
        data[[0, 0, 0]] = f64::NAN;
        for i in 0..3 {
            for j in 0..3 {
                data[[1, i, j]] = f64::NAN;
            }
        }
        dataset.insert_array("malaria_risk_index", "1", data).unwrap();

        let series = LocationExtractor::new()
            .extract(&dataset, &LocationQuery::new(0.0, 36.0, 1.0), &["malaria_risk_index"])
            .unwrap();
        let values = series.column("malaria_risk_index").unwrap();
        assert!((values[0] - 0.0225).abs() < 1e-12);
        assert!(values[1].is_nan());
    }

    #[test]
    fn test_buffer_wraps_around_prime_meridian() {
        let time = vec![NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()];
        let coords = GridCoordinates::new(time, vec![0.0], vec![0.0, 0.5, 180.0, 359.5]);
        let mut dataset = GridDataset::new(coords).unwrap();
        dataset
            .insert_array(
                "temp_suitability",
                "1",
                Array3::from_shape_fn((1, 1, 4), |(_, _, j)| j as f64),
            )
            .unwrap();

        let series = LocationExtractor::new()
            .extract(&dataset, &LocationQuery::new(0.0, -0.25, 0.5), &["temp_suitability"])
            .unwrap();

        // 0.0 and 359.5 both lie 0.25 degrees from the query point
        assert_eq!(series.cells_selected, 2);
        assert!((series.rows[0].values[0] - 1.5).abs() < 1e-12);
    }
}
