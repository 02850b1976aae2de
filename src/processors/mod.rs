pub mod batch_processor;
pub mod humidity;
pub mod integrity_checker;
pub mod location_extractor;
pub mod pipeline;
pub mod risk_combiner;
pub mod suitability;
pub mod temporal_aggregator;

pub use batch_processor::BatchProcessor;
pub use integrity_checker::{
    GridViolation, IntegrityChecker, IntegrityReport, VariableStatistics, ViolationType,
};
pub use location_extractor::LocationExtractor;
pub use pipeline::{PipelineOutput, RiskPipeline};
pub use risk_combiner::{RiskCombiner, RiskWeights};
pub use temporal_aggregator::{Reducer, ReducerTable, TemporalAggregator, TimeResolution};
