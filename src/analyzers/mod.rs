pub mod grid_analyzer;

pub use grid_analyzer::{GridAnalyzer, GridStatistics};
