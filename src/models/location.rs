use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::constants::DEFAULT_BUFFER_DEGREES;

/// A point of interest with a rectangular buffer, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct LocationQuery {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 360.0))]
    pub longitude: f64,

    #[validate(range(exclusive_min = 0.0, max = 90.0))]
    pub buffer: f64,
}

impl LocationQuery {
    pub fn new(latitude: f64, longitude: f64, buffer: f64) -> Self {
        Self {
            latitude,
            longitude,
            buffer,
        }
    }

    pub fn with_default_buffer(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, DEFAULT_BUFFER_DEGREES)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRow {
    pub time: NaiveDateTime,
    pub values: Vec<f64>,
}

/// Buffer-averaged values at one location, one row per time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTimeseries {
    pub query: LocationQuery,
    pub cells_selected: usize,
    pub columns: Vec<String>,
    pub rows: Vec<TimeseriesRow>,
}

impl LocationTimeseries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| row.values[index]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_validation() {
        assert!(LocationQuery::new(-1.29, 36.82, 1.0).validate().is_ok());
        assert!(LocationQuery::new(91.0, 36.82, 1.0).validate().is_err());
        assert!(LocationQuery::new(0.0, 36.82, 0.0).validate().is_err());
        assert!(LocationQuery::new(0.0, 350.0, 0.5).validate().is_ok());
    }

    #[test]
    fn test_default_buffer() {
        let query = LocationQuery::with_default_buffer(5.0, 10.0);
        assert_eq!(query.buffer, 1.0);
    }
}
