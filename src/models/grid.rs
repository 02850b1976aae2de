use chrono::NaiveDateTime;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};

/// Shared (time, latitude, longitude) axes of a gridded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCoordinates {
    pub time: Vec<NaiveDateTime>,
    pub latitude: Vec<f64>,
    pub longitude: Vec<f64>,
}

impl GridCoordinates {
    pub fn new(time: Vec<NaiveDateTime>, latitude: Vec<f64>, longitude: Vec<f64>) -> Self {
        Self {
            time,
            latitude,
            longitude,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.time.len(), self.latitude.len(), self.longitude.len())
    }

    pub fn cell_count(&self) -> usize {
        self.time.len() * self.latitude.len() * self.longitude.len()
    }

    pub fn has_empty_axis(&self) -> bool {
        self.time.is_empty() || self.latitude.is_empty() || self.longitude.is_empty()
    }

    pub fn time_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.time.iter().min()?;
        let last = self.time.iter().max()?;
        Some((*first, *last))
    }

    /// True when longitudes use the 0..360 convention.
    pub fn uses_360_longitude(&self) -> bool {
        self.longitude.iter().any(|&lon| lon > 180.0)
    }
}

/// A named array over the dataset axes, indexed (time, latitude, longitude).
#[derive(Debug, Clone, PartialEq)]
pub struct GridVariable {
    pub name: String,
    pub units: String,
    pub data: Array3<f64>,
}

impl GridVariable {
    pub fn new(name: impl Into<String>, units: impl Into<String>, data: Array3<f64>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            data,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn missing_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    pub fn infinite_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_infinite()).count()
    }
}

/// Multi-variable gridded data sharing one coordinate system.
///
/// Variables keep their insertion order so that written output is stable
/// from run to run.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDataset {
    coords: GridCoordinates,
    variables: Vec<GridVariable>,
}

impl GridDataset {
    pub fn new(coords: GridCoordinates) -> Result<Self> {
        if coords.has_empty_axis() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Grid axes must be non-empty, got shape {:?}",
                coords.shape()
            )));
        }

        Ok(Self {
            coords,
            variables: Vec::new(),
        })
    }

    pub fn coords(&self) -> &GridCoordinates {
        &self.coords
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.coords.shape()
    }

    pub fn variables(&self) -> &[GridVariable] {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v.name == name)
    }

    /// Look up a variable, failing with `MissingVariable` when absent.
    pub fn variable(&self, name: &str) -> Result<&GridVariable> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ProcessingError::missing_variable(name))
    }

    pub fn data(&self, name: &str) -> Result<&Array3<f64>> {
        Ok(&self.variable(name)?.data)
    }

    /// Fail on the first name in `names` that is not present.
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.has_variable(name) {
                return Err(ProcessingError::missing_variable(*name));
            }
        }
        Ok(())
    }

    /// Insert a variable, replacing any existing variable of the same name in place.
    pub fn insert(&mut self, variable: GridVariable) -> Result<()> {
        let expected = self.coords.shape();
        let actual = variable.shape();
        if actual != expected {
            return Err(ProcessingError::ShapeMismatch {
                name: variable.name,
                expected,
                actual,
            });
        }

        match self.variables.iter_mut().find(|v| v.name == variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
        Ok(())
    }

    pub fn insert_array(
        &mut self,
        name: &str,
        units: &str,
        data: Array3<f64>,
    ) -> Result<()> {
        self.insert(GridVariable::new(name, units, data))
    }

    /// Replace the coordinates and variables wholesale, e.g. after aggregation.
    pub fn with_parts(coords: GridCoordinates, variables: Vec<GridVariable>) -> Result<Self> {
        let mut dataset = Self::new(coords)?;
        for variable in variables {
            dataset.insert(variable)?;
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn coords(steps: usize) -> GridCoordinates {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let time = (0..steps)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect();
        GridCoordinates::new(time, vec![-1.0, 0.0, 1.0], vec![30.0, 31.0])
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut dataset = GridDataset::new(coords(4)).unwrap();
        dataset
            .insert_array("t2m", "K", Array3::from_elem((4, 3, 2), 300.0))
            .unwrap();

        assert!(dataset.has_variable("t2m"));
        assert_eq!(dataset.variable("t2m").unwrap().units, "K");
        assert_eq!(dataset.variable_names(), vec!["t2m"]);
    }

    #[test]
    fn test_missing_variable_lookup() {
        let dataset = GridDataset::new(coords(4)).unwrap();
        let err = dataset.variable("d2m").unwrap_err();
        assert!(matches!(err, ProcessingError::MissingVariable { ref name } if name == "d2m"));
        assert!(dataset.require(&["t2m", "d2m"]).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut dataset = GridDataset::new(coords(4)).unwrap();
        let expected = dataset.shape();
        let result = dataset.insert_array("tp", "m", Array3::zeros((3, 3, 2)));
        match result {
            Err(ProcessingError::ShapeMismatch {
                name,
                expected: e,
                actual,
            }) => {
                assert_eq!(name, "tp");
                assert_eq!(e, expected);
                assert_eq!(actual, (3, 3, 2));
            }
            other => panic!("expected shape mismatch, got {:?}", other),
        }
        assert!(!dataset.has_variable("tp"));
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut dataset = GridDataset::new(coords(2)).unwrap();
        dataset.insert_array("a", "1", Array3::zeros((2, 3, 2))).unwrap();
        dataset.insert_array("b", "1", Array3::zeros((2, 3, 2))).unwrap();
        dataset.insert_array("a", "1", Array3::ones((2, 3, 2))).unwrap();

        assert_eq!(dataset.variable_names(), vec!["a", "b"]);
        assert_eq!(dataset.data("a").unwrap()[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_empty_axis_rejected() {
        let empty = GridCoordinates::new(vec![], vec![0.0], vec![0.0]);
        assert!(GridDataset::new(empty).is_err());
    }
}
