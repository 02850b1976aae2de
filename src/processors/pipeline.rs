//! Pipeline orchestrator.
//!
//! Sequences `Loading -> Transforming -> Aggregating (optional) -> Finalizing`
//! and always returns a [`ProcessingResult`] with the elapsed duration, on
//! success and on failure alike. Finalizing derives the composite index from
//! the (possibly aggregated) layers and hands the dataset to its consumer.

use ndarray::Array3;
use std::path::Path;
use std::time::Instant;

use crate::error::{ProcessingError, Result};
use crate::models::result::ResultAccumulator;
use crate::models::{
    GridDataset, GridVariable, LocationQuery, LocationTimeseries, PipelineStage,
    ProcessingResult, RiskThresholds,
};
use crate::processors::integrity_checker::IntegrityChecker;
use crate::processors::location_extractor::LocationExtractor;
use crate::processors::risk_combiner::{RiskCombiner, RiskWeights, COMBINER_OUTPUTS};
use crate::processors::suitability::{growing_degree_days_array, temperature_suitability_array};
use crate::processors::temporal_aggregator::{ReducerTable, TemporalAggregator, TimeResolution};
use crate::readers::GridSource;
use crate::utils::constants::{
    INDEX_MALARIA_RISK, KELVIN_OFFSET, UNITS_CELSIUS, UNITS_DEGREE_DAYS, UNITS_DIMENSIONLESS,
    UNITS_KELVIN, VAR_DEWPOINT, VAR_GROWING_DEGREE_DAYS, VAR_PRECIPITATION, VAR_TEMPERATURE,
    VAR_TEMPERATURE_CELSIUS, VAR_TEMPERATURE_MAX, VAR_TEMPERATURE_MAX_CELSIUS,
    VAR_TEMPERATURE_MIN, VAR_TEMPERATURE_MIN_CELSIUS, VAR_TEMP_SUITABILITY,
};
use crate::writers::GridSink;

/// Raw inputs checked for non-finite values before any transform runs.
const RAW_INPUTS: [&str; 5] = [
    VAR_TEMPERATURE,
    VAR_DEWPOINT,
    VAR_PRECIPITATION,
    VAR_TEMPERATURE_MAX,
    VAR_TEMPERATURE_MIN,
];

/// Result of an in-memory run: the augmented dataset is present only on success.
#[derive(Debug)]
pub struct PipelineOutput {
    pub result: ProcessingResult,
    pub dataset: Option<GridDataset>,
}

#[derive(Debug, Clone)]
pub struct RiskPipeline {
    thresholds: RiskThresholds,
    weights: RiskWeights,
    aggregation: Option<TimeResolution>,
    reducers: ReducerTable,
}

impl RiskPipeline {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self {
            thresholds,
            weights: RiskWeights::default(),
            aggregation: None,
            reducers: ReducerTable::default(),
        }
    }

    pub fn with_weights(mut self, weights: RiskWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_aggregation(mut self, resolution: Option<TimeResolution>) -> Self {
        self.aggregation = resolution;
        self
    }

    pub fn with_reducers(mut self, reducers: ReducerTable) -> Self {
        self.reducers = reducers;
        self
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Run every stage after loading on an in-memory dataset.
    pub fn process_dataset(&self, dataset: GridDataset) -> PipelineOutput {
        let started = Instant::now();
        let mut acc = ResultAccumulator::new();

        match self.run_core(&mut acc, dataset) {
            Ok(dataset) => PipelineOutput {
                result: acc.succeed(started.elapsed()),
                dataset: Some(dataset),
            },
            Err(e) => PipelineOutput {
                result: self.fail(acc, e, started),
                dataset: None,
            },
        }
    }

    /// Grid mode: load, transform, and hand the augmented grid to `sink`.
    pub fn process_file(
        &self,
        source: &dyn GridSource,
        input: &Path,
        sink: Option<(&dyn GridSink, &Path)>,
    ) -> ProcessingResult {
        let started = Instant::now();
        let mut acc = ResultAccumulator::new();
        acc.set_input(input);

        let outcome = self.load(&mut acc, source, input).and_then(|dataset| {
            let dataset = self.run_core(&mut acc, dataset)?;
            if let Some((writer, output)) = sink {
                writer
                    .write(&dataset, output)
                    .map_err(|e| ProcessingError::OutputUnwritable {
                        path: output.display().to_string(),
                        message: e.to_string(),
                    })?;
                acc.set_output(output);
            }
            Ok(())
        });

        match outcome {
            Ok(()) => acc.succeed(started.elapsed()),
            Err(e) => self.fail(acc, e, started),
        }
    }

    /// Location mode: load, transform, then extract a buffered series for `variables`.
    pub fn process_location(
        &self,
        source: &dyn GridSource,
        input: &Path,
        query: &LocationQuery,
        variables: &[&str],
    ) -> (ProcessingResult, Option<LocationTimeseries>) {
        let started = Instant::now();
        let mut acc = ResultAccumulator::new();
        acc.set_input(input);

        let outcome = self.load(&mut acc, source, input).and_then(|dataset| {
            let dataset = self.run_core(&mut acc, dataset)?;
            LocationExtractor::new().extract(&dataset, query, variables)
        });

        match outcome {
            Ok(series) => (acc.succeed(started.elapsed()), Some(series)),
            Err(e) => (self.fail(acc, e, started), None),
        }
    }

    fn fail(&self, acc: ResultAccumulator, error: ProcessingError, started: Instant) -> ProcessingResult {
        tracing::warn!("pipeline failed during {}: {}", acc.stage(), error);
        acc.fail(&error, started.elapsed())
    }

    fn load(
        &self,
        acc: &mut ResultAccumulator,
        source: &dyn GridSource,
        input: &Path,
    ) -> Result<GridDataset> {
        acc.enter(PipelineStage::Loading);
        source.load(input).map_err(|e| match e {
            ProcessingError::SourceUnreadable { .. } => e,
            other => ProcessingError::SourceUnreadable {
                path: input.display().to_string(),
                message: other.to_string(),
            },
        })
    }

    fn run_core(&self, acc: &mut ResultAccumulator, dataset: GridDataset) -> Result<GridDataset> {
        if let Err(e) = self.thresholds.validate_ordering() {
            tracing::warn!("thresholds used as given: {}", e);
        }

        acc.enter(PipelineStage::Transforming);
        let mut dataset = dataset;
        self.transform(acc, &mut dataset)?;

        if let Some(resolution) = self.aggregation {
            acc.enter(PipelineStage::Aggregating);
            let aggregator =
                TemporalAggregator::new(resolution).with_reducers(self.reducers.clone());
            let before = dataset.coords().time.len();
            dataset = aggregator.aggregate(&dataset)?;
            tracing::info!(
                "aggregated {} -> {} time steps ({:?})",
                before,
                dataset.coords().time.len(),
                resolution
            );
        }

        acc.enter(PipelineStage::Finalizing);
        RiskCombiner::new(self.thresholds)
            .with_weights(self.weights)
            .apply(&mut dataset)?;
        for name in COMBINER_OUTPUTS {
            if name == INDEX_MALARIA_RISK {
                acc.record_index(name);
            } else {
                acc.record_variable(name);
            }
        }

        Ok(dataset)
    }

    /// Unit conversion and per-variable suitability layers.
    fn transform(&self, acc: &mut ResultAccumulator, dataset: &mut GridDataset) -> Result<()> {
        dataset.require(&[VAR_TEMPERATURE])?;

        let present: Vec<&str> = RAW_INPUTS
            .iter()
            .copied()
            .filter(|name| dataset.has_variable(name))
            .collect();
        let checker = IntegrityChecker::new();
        let report = checker.ensure_finite(dataset, &present)?;
        if report.missing_cells > 0 {
            tracing::debug!("{} missing cell(s) in raw inputs", report.missing_cells);
        }
        for violation in &report.violations {
            tracing::warn!("{}", violation.details);
        }

        let temp_c = kelvin_to_celsius(dataset.variable(VAR_TEMPERATURE)?)?;
        let suitability = temperature_suitability_array(&temp_c, &self.thresholds);
        let gdd = growing_degree_days_array(&temp_c, self.thresholds.degree_day_base());

        dataset.insert_array(VAR_TEMPERATURE_CELSIUS, UNITS_CELSIUS, temp_c)?;
        acc.record_variable(VAR_TEMPERATURE_CELSIUS);
        dataset.insert_array(VAR_TEMP_SUITABILITY, UNITS_DIMENSIONLESS, suitability)?;
        acc.record_variable(VAR_TEMP_SUITABILITY);
        dataset.insert_array(VAR_GROWING_DEGREE_DAYS, UNITS_DEGREE_DAYS, gdd)?;
        acc.record_variable(VAR_GROWING_DEGREE_DAYS);

        for (name, derived) in [
            (VAR_TEMPERATURE_MAX, VAR_TEMPERATURE_MAX_CELSIUS),
            (VAR_TEMPERATURE_MIN, VAR_TEMPERATURE_MIN_CELSIUS),
        ] {
            if dataset.has_variable(name) {
                let celsius = kelvin_to_celsius(dataset.variable(name)?)?;
                dataset.insert_array(derived, UNITS_CELSIUS, celsius)?;
                acc.record_variable(derived);
            }
        }

        tracing::info!(
            "transformed temperature layers over {:?} cells",
            dataset.shape()
        );
        Ok(())
    }
}

impl Default for RiskPipeline {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}

/// Kelvin to degC. Variables without units are taken to be Kelvin.
fn kelvin_to_celsius(variable: &GridVariable) -> Result<Array3<f64>> {
    match variable.units.as_str() {
        UNITS_KELVIN | "" => Ok(variable.data.mapv(|k| k - KELVIN_OFFSET)),
        other => Err(ProcessingError::Computation(format!(
            "{} must be in Kelvin, found units '{}'",
            variable.name, other
        ))),
    }
}
