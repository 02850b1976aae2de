pub mod grid_reader;

pub use grid_reader::{GridReader, GridSource};
