use crate::error::{ProcessingError, Result};
use crate::models::GridDataset;
use crate::utils::constants::{
    MAX_PLAUSIBLE_PRECIP_M, MAX_PLAUSIBLE_TEMP_K, MIN_PLAUSIBLE_TEMP_K, UNITS_KELVIN,
    UNITS_METRES,
};

#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub total_cells: usize,
    pub variables_checked: usize,
    pub missing_cells: usize,
    pub non_finite_cells: usize,
    pub violations: Vec<GridViolation>,
    pub variable_statistics: Vec<VariableStatistics>,
}

impl IntegrityReport {
    pub fn has_non_finite(&self) -> bool {
        self.non_finite_cells > 0
    }
}

#[derive(Debug, Clone)]
pub struct GridViolation {
    pub variable: String,
    pub violation_type: ViolationType,
    pub cells: usize,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationType {
    NonFinite,
    OutOfRange,
    AllMissing,
}

#[derive(Debug, Clone, Default)]
pub struct VariableStatistics {
    pub name: String,
    pub units: String,
    pub valid_cells: usize,
    pub missing_cells: usize,
    pub non_finite_cells: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

pub struct IntegrityChecker {
    min_temp_k: f64,
    max_temp_k: f64,
    max_precip_m: f64,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            min_temp_k: MIN_PLAUSIBLE_TEMP_K,
            max_temp_k: MAX_PLAUSIBLE_TEMP_K,
            max_precip_m: MAX_PLAUSIBLE_PRECIP_M,
        }
    }

    /// Check every variable in the dataset.
    pub fn check_integrity(&self, dataset: &GridDataset) -> IntegrityReport {
        let names: Vec<&str> = dataset.variable_names();
        self.check_variables(dataset, &names)
    }

    /// Check only the named variables; names not present are skipped.
    pub fn check_variables(&self, dataset: &GridDataset, names: &[&str]) -> IntegrityReport {
        let mut report = IntegrityReport {
            total_cells: dataset.coords().cell_count(),
            variables_checked: 0,
            missing_cells: 0,
            non_finite_cells: 0,
            violations: Vec::new(),
            variable_statistics: Vec::new(),
        };

        for variable in dataset.variables().iter().filter(|v| names.contains(&v.name.as_str())) {
            report.variables_checked += 1;

            let mut stats = VariableStatistics {
                name: variable.name.clone(),
                units: variable.units.clone(),
                ..Default::default()
            };
            let mut out_of_range = 0usize;

            for &value in variable.data.iter() {
                if value.is_nan() {
                    stats.missing_cells += 1;
                    continue;
                }
                if value.is_infinite() {
                    stats.non_finite_cells += 1;
                    continue;
                }

                stats.valid_cells += 1;
                stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
                stats.max = Some(stats.max.map_or(value, |m| m.max(value)));

                if !self.is_plausible(&variable.units, value) {
                    out_of_range += 1;
                }
            }

            if stats.non_finite_cells > 0 {
                report.violations.push(GridViolation {
                    variable: variable.name.clone(),
                    violation_type: ViolationType::NonFinite,
                    cells: stats.non_finite_cells,
                    details: format!(
                        "{} contains {} infinite value(s)",
                        variable.name, stats.non_finite_cells
                    ),
                });
            }

            if out_of_range > 0 {
                // Reported only; implausible values still flow through the transforms
                report.violations.push(GridViolation {
                    variable: variable.name.clone(),
                    violation_type: ViolationType::OutOfRange,
                    cells: out_of_range,
                    details: format!(
                        "{} has {} value(s) outside the plausible range for units '{}'",
                        variable.name, out_of_range, variable.units
                    ),
                });
            }

            if stats.valid_cells == 0 {
                report.violations.push(GridViolation {
                    variable: variable.name.clone(),
                    violation_type: ViolationType::AllMissing,
                    cells: stats.missing_cells,
                    details: format!("{} has no valid observations", variable.name),
                });
            }

            report.missing_cells += stats.missing_cells;
            report.non_finite_cells += stats.non_finite_cells;
            report.variable_statistics.push(stats);
        }

        report
    }

    /// Fail with a computation error when any of `names` holds infinite values.
    pub fn ensure_finite(&self, dataset: &GridDataset, names: &[&str]) -> Result<IntegrityReport> {
        let report = self.check_variables(dataset, names);
        if let Some(violation) = report
            .violations
            .iter()
            .find(|v| v.violation_type == ViolationType::NonFinite)
        {
            return Err(ProcessingError::Computation(violation.details.clone()));
        }
        Ok(report)
    }

    fn is_plausible(&self, units: &str, value: f64) -> bool {
        match units {
            UNITS_KELVIN => (self.min_temp_k..=self.max_temp_k).contains(&value),
            UNITS_METRES => (0.0..=self.max_precip_m).contains(&value),
            _ => true,
        }
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("Cells per variable: {}\n", report.total_cells));
        summary.push_str(&format!("Variables checked: {}\n", report.variables_checked));
        summary.push_str(&format!("Missing cells: {}\n", report.missing_cells));
        summary.push_str(&format!("Non-finite cells: {}\n", report.non_finite_cells));

        summary.push_str("\nVariables:\n");
        for stats in &report.variable_statistics {
            let range = match (stats.min, stats.max) {
                (Some(min), Some(max)) => format!("{:.3} to {:.3}", min, max),
                _ => "no valid values".to_string(),
            };
            summary.push_str(&format!(
                "  {} [{}]: {} valid, {} missing, range {}\n",
                stats.name, stats.units, stats.valid_cells, stats.missing_cells, range
            ));
        }

        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));
        for (i, violation) in report.violations.iter().take(10).enumerate() {
            summary.push_str(&format!("  {}. {}\n", i + 1, violation.details));
        }

        summary
    }
}

impl Default for IntegrityChecker {
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

    fn dataset() -> GridDataset {
        let time = vec![NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()];
        let coords = GridCoordinates::new(time, vec![0.0], vec![0.0, 1.0, 2.0]);
        let mut dataset = GridDataset::new(coords).unwrap();
        dataset
            .insert_array(
                "t2m",
                "K",
                Array3::from_shape_vec((1, 1, 3), vec![295.0, f64::NAN, 400.0]).unwrap(),
            )
            .unwrap();
        dataset
            .insert_array(
                "tp",
                "m",
                Array3::from_shape_vec((1, 1, 3), vec![0.01, f64::INFINITY, 0.0]).unwrap(),
            )
            .unwrap();
        dataset
    }

    #[test]
    fn test_counts_missing_and_non_finite() {
        let checker = IntegrityChecker::new();
        let report = checker.check_integrity(&dataset());

        assert_eq!(report.variables_checked, 2);
        assert_eq!(report.missing_cells, 1);
        assert_eq!(report.non_finite_cells, 1);
        assert!(report
            .violations
            .iter()
            .any(|v| v.variable == "t2m" && v.violation_type == ViolationType::OutOfRange));

        let summary = checker.generate_summary(&report);
        assert!(summary.contains("Integrity Check Report"));
        assert!(summary.contains("t2m [K]"));
    }

    #[test]
    fn test_ensure_finite() {
        let checker = IntegrityChecker::new();
        let data = dataset();

        assert!(checker.ensure_finite(&data, &["t2m"]).is_ok());
        let err = checker.ensure_finite(&data, &["t2m", "tp"]).unwrap_err();
        assert!(matches!(err, ProcessingError::Computation(_)));
    }
}
