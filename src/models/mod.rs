pub mod grid;
pub mod location;
pub mod result;
pub mod thresholds;

pub use grid::{GridCoordinates, GridDataset, GridVariable};
pub use location::{LocationQuery, LocationTimeseries, TimeseriesRow};
pub use result::{PipelineStage, ProcessingResult};
pub use thresholds::RiskThresholds;
