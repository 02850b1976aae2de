pub mod constants;
pub mod coordinates;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use coordinates::{
    align_longitude, indices_within, longitude_distance, longitude_indices_within,
    to_positive_longitude, to_signed_longitude,
};
pub use filename::{generate_default_location_filename, risk_output_filename};
pub use progress::ProgressReporter;
