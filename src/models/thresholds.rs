use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ProcessingError, Result};

/// Calibration thresholds for the suitability transforms.
///
/// Built once per pipeline run and passed explicitly into every transform.
/// Overrides replace single fields; values are used as given and ordering is
/// only checked by [`RiskThresholds::validate_ordering`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    temp_min_threshold: f64,
    temp_optimal_min: f64,
    temp_optimal_max: f64,
    temp_max_threshold: f64,
    precip_min_monthly: f64,
    precip_optimal: f64,
    humidity_min: f64,
    humidity_optimal: f64,
    degree_day_base: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            temp_min_threshold: 16.0,
            temp_optimal_min: 22.0,
            temp_optimal_max: 32.0,
            temp_max_threshold: 40.0,
            precip_min_monthly: 80.0,
            precip_optimal: 150.0,
            humidity_min: 60.0,
            humidity_optimal: 80.0,
            degree_day_base: 16.0,
        }
    }
}

impl RiskThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from a TOML/JSON/YAML file; fields absent from the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProcessingError::Config(format!(
                "Thresholds file not found: {}",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;

        Ok(settings.try_deserialize::<RiskThresholds>()?)
    }

    pub fn with_temp_min_threshold(mut self, value: f64) -> Self {
        self.temp_min_threshold = value;
        self
    }

    pub fn with_temp_optimal_min(mut self, value: f64) -> Self {
        self.temp_optimal_min = value;
        self
    }

    pub fn with_temp_optimal_max(mut self, value: f64) -> Self {
        self.temp_optimal_max = value;
        self
    }

    pub fn with_temp_max_threshold(mut self, value: f64) -> Self {
        self.temp_max_threshold = value;
        self
    }

    pub fn with_precip_min_monthly(mut self, value: f64) -> Self {
        self.precip_min_monthly = value;
        self
    }

    pub fn with_precip_optimal(mut self, value: f64) -> Self {
        self.precip_optimal = value;
        self
    }

    pub fn with_humidity_min(mut self, value: f64) -> Self {
        self.humidity_min = value;
        self
    }

    pub fn with_humidity_optimal(mut self, value: f64) -> Self {
        self.humidity_optimal = value;
        self
    }

    pub fn with_degree_day_base(mut self, value: f64) -> Self {
        self.degree_day_base = value;
        self
    }

    pub fn temp_min_threshold(&self) -> f64 {
        self.temp_min_threshold
    }

    pub fn temp_optimal_min(&self) -> f64 {
        self.temp_optimal_min
    }

    pub fn temp_optimal_max(&self) -> f64 {
        self.temp_optimal_max
    }

    pub fn temp_max_threshold(&self) -> f64 {
        self.temp_max_threshold
    }

    pub fn precip_min_monthly(&self) -> f64 {
        self.precip_min_monthly
    }

    pub fn precip_optimal(&self) -> f64 {
        self.precip_optimal
    }

    pub fn humidity_min(&self) -> f64 {
        self.humidity_min
    }

    pub fn humidity_optimal(&self) -> f64 {
        self.humidity_optimal
    }

    pub fn degree_day_base(&self) -> f64 {
        self.degree_day_base
    }

    /// Check that every threshold pair is strictly increasing.
    pub fn validate_ordering(&self) -> Result<()> {
        let pairs = [
            ("temp_min_threshold", self.temp_min_threshold, "temp_optimal_min", self.temp_optimal_min),
            ("temp_optimal_min", self.temp_optimal_min, "temp_optimal_max", self.temp_optimal_max),
            ("temp_optimal_max", self.temp_optimal_max, "temp_max_threshold", self.temp_max_threshold),
            ("precip_min_monthly", self.precip_min_monthly, "precip_optimal", self.precip_optimal),
            ("humidity_min", self.humidity_min, "humidity_optimal", self.humidity_optimal),
        ];

        for (lower_name, lower, upper_name, upper) in pairs {
            if lower.is_nan() || upper.is_nan() || lower >= upper {
                return Err(ProcessingError::Config(format!(
                    "{} ({}) must be less than {} ({})",
                    lower_name, lower, upper_name, upper
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_values() {
        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.temp_min_threshold(), 16.0);
        assert_eq!(thresholds.temp_optimal_min(), 22.0);
        assert_eq!(thresholds.temp_optimal_max(), 32.0);
        assert_eq!(thresholds.temp_max_threshold(), 40.0);
        assert_eq!(thresholds.precip_min_monthly(), 80.0);
        assert_eq!(thresholds.precip_optimal(), 150.0);
        assert_eq!(thresholds.humidity_min(), 60.0);
        assert_eq!(thresholds.humidity_optimal(), 80.0);
        assert!(thresholds.validate_ordering().is_ok());
    }

    #[test]
    fn test_override_replaces_only_named_field() {
        let thresholds = RiskThresholds::default().with_temp_optimal_min(20.0);
        assert_eq!(thresholds.temp_optimal_min(), 20.0);
        assert_eq!(thresholds.temp_min_threshold(), 16.0);
        assert_eq!(thresholds.temp_optimal_max(), 32.0);
        assert_eq!(thresholds.humidity_optimal(), 80.0);
    }

    #[test]
    fn test_inverted_thresholds_are_accepted_but_reported() {
        let thresholds = RiskThresholds::default().with_humidity_min(90.0);
        assert_eq!(thresholds.humidity_min(), 90.0);

        let err = thresholds.validate_ordering().unwrap_err();
        assert!(err.to_string().contains("humidity_min"));
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "precip_optimal = 200.0").unwrap();
        writeln!(file, "humidity_min = 55.0").unwrap();

        let thresholds = RiskThresholds::from_file(file.path()).unwrap();
        assert_eq!(thresholds.precip_optimal(), 200.0);
        assert_eq!(thresholds.humidity_min(), 55.0);
        assert_eq!(thresholds.temp_optimal_max(), 32.0);
    }

    #[test]
    fn test_from_missing_file() {
        let result = RiskThresholds::from_file(Path::new("/nonexistent/thresholds.toml"));
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }
}
