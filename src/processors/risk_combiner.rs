use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::error::{ProcessingError, Result};
use crate::models::{GridDataset, RiskThresholds};
use crate::processors::humidity::relative_humidity;
use crate::processors::suitability::{humidity_risk_array, precipitation_risk_array};
use crate::utils::constants::{
    DEFAULT_HUMIDITY_WEIGHT, DEFAULT_PRECIP_WEIGHT, DEFAULT_TEMP_WEIGHT, INDEX_MALARIA_RISK,
    METRES_TO_MM, UNITS_DIMENSIONLESS, UNITS_MILLIMETRES, UNITS_PERCENT, VAR_DEWPOINT,
    VAR_HUMIDITY_RISK, VAR_PRECIPITATION, VAR_PRECIPITATION_MM, VAR_PRECIP_RISK,
    VAR_RELATIVE_HUMIDITY, VAR_TEMPERATURE, VAR_TEMP_SUITABILITY,
};

/// Relative weight of each factor in the composite index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub temperature: f64,
    pub precipitation: f64,
    pub humidity: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMP_WEIGHT,
            precipitation: DEFAULT_PRECIP_WEIGHT,
            humidity: DEFAULT_HUMIDITY_WEIGHT,
        }
    }
}

impl RiskWeights {
    pub fn new(temperature: f64, precipitation: f64, humidity: f64) -> Self {
        Self {
            temperature,
            precipitation,
            humidity,
        }
    }

    /// Weights scaled to sum to one. Negative, non-finite or all-zero weights are rejected.
    pub fn normalized(&self) -> Result<(f64, f64, f64)> {
        let weights = [self.temperature, self.precipitation, self.humidity];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ProcessingError::Config(format!(
                "Risk weights must be finite and non-negative: {:?}",
                self
            )));
        }

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ProcessingError::Config(
                "Risk weights must not all be zero".to_string(),
            ));
        }

        Ok((
            self.temperature / total,
            self.precipitation / total,
            self.humidity / total,
        ))
    }
}

/// Combine three factor scores into one index in [0, 1].
///
/// A weighted mean of [0, 1] inputs with non-negative weights; monotone
/// non-decreasing in each component. NaN in any factor yields NaN.
pub fn combine_scores(temp: f64, precip: f64, humidity: f64, weights: (f64, f64, f64)) -> f64 {
    if temp.is_nan() || precip.is_nan() || humidity.is_nan() {
        return f64::NAN;
    }
    let (wt, wp, wh) = weights;
    (wt * temp + wp * precip + wh * humidity).clamp(0.0, 1.0)
}

/// Names of the layers a composite run appends, in the order they are added.
pub const COMBINER_OUTPUTS: [&str; 5] = [
    VAR_RELATIVE_HUMIDITY,
    VAR_HUMIDITY_RISK,
    VAR_PRECIPITATION_MM,
    VAR_PRECIP_RISK,
    INDEX_MALARIA_RISK,
];

pub struct RiskCombiner {
    thresholds: RiskThresholds,
    weights: RiskWeights,
}

impl RiskCombiner {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self {
            thresholds,
            weights: RiskWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn required_inputs() -> [&'static str; 4] {
        [
            VAR_TEMP_SUITABILITY,
            VAR_TEMPERATURE,
            VAR_DEWPOINT,
            VAR_PRECIPITATION,
        ]
    }

    /// Derive the humidity and precipitation factors and the composite index,
    /// appending them to `dataset`.
    ///
    /// Fails with `MissingVariable` before touching the dataset when any input is absent.
    pub fn apply(&self, dataset: &mut GridDataset) -> Result<()> {
        dataset.require(&Self::required_inputs())?;
        let weights = self.weights.normalized()?;

        let rh = relative_humidity(dataset.data(VAR_DEWPOINT)?, dataset.data(VAR_TEMPERATURE)?)?;
        let humidity = humidity_risk_array(&rh, &self.thresholds);

        let precip_mm = dataset.data(VAR_PRECIPITATION)?.mapv(|m| m * METRES_TO_MM);
        let precip = precipitation_risk_array(&precip_mm, &self.thresholds);

        let temp = dataset.data(VAR_TEMP_SUITABILITY)?;
        let mut index = Array3::<f64>::zeros(dataset.shape());
        Zip::from(&mut index)
            .and(temp)
            .and(&precip)
            .and(&humidity)
            .for_each(|out, &t, &p, &h| *out = combine_scores(t, p, h, weights));

        dataset.insert_array(VAR_RELATIVE_HUMIDITY, UNITS_PERCENT, rh)?;
        dataset.insert_array(VAR_HUMIDITY_RISK, UNITS_DIMENSIONLESS, humidity)?;
        dataset.insert_array(VAR_PRECIPITATION_MM, UNITS_MILLIMETRES, precip_mm)?;
        dataset.insert_array(VAR_PRECIP_RISK, UNITS_DIMENSIONLESS, precip)?;
        dataset.insert_array(INDEX_MALARIA_RISK, UNITS_DIMENSIONLESS, index)?;

        tracing::info!(
            "computed {} over {:?} cells (weights t={:.2} p={:.2} h={:.2})",
            INDEX_MALARIA_RISK,
            dataset.shape(),
            weights.0,
            weights.1,
            weights.2
        );
        Ok(())
    }
}
