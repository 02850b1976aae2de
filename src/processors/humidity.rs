use ndarray::{Array3, Zip};

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{KELVIN_OFFSET, MAGNUS_A, MAGNUS_B, MAGNUS_E0};

/// Saturation vapour pressure (hPa) at `temp_c` degC, Magnus form.
pub fn saturation_vapour_pressure(temp_c: f64) -> f64 {
    MAGNUS_E0 * ((MAGNUS_A * temp_c) / (temp_c + MAGNUS_B)).exp()
}

/// Relative humidity (%) from dewpoint and air temperature, both in degC.
pub fn relative_humidity_celsius(dewpoint_c: f64, temp_c: f64) -> f64 {
    100.0 * saturation_vapour_pressure(dewpoint_c) / saturation_vapour_pressure(temp_c)
}

/// Relative humidity (%) from dewpoint and air temperature, both in Kelvin.
pub fn relative_humidity_kelvin(dewpoint_k: f64, temp_k: f64) -> f64 {
    relative_humidity_celsius(dewpoint_k - KELVIN_OFFSET, temp_k - KELVIN_OFFSET)
}

/// Element-wise relative humidity over Kelvin grids.
///
/// Missing cells (NaN in either input) stay missing. A finite input pair
/// that yields a non-finite humidity is a computation error.
pub fn relative_humidity(dewpoint_k: &Array3<f64>, temp_k: &Array3<f64>) -> Result<Array3<f64>> {
    if dewpoint_k.dim() != temp_k.dim() {
        return Err(ProcessingError::ShapeMismatch {
            name: "dewpoint".to_string(),
            expected: temp_k.dim(),
            actual: dewpoint_k.dim(),
        });
    }

    let mut rh = Array3::<f64>::zeros(temp_k.dim());
    let mut unresolved = 0usize;

    Zip::from(&mut rh)
        .and(dewpoint_k)
        .and(temp_k)
        .for_each(|out, &td, &t| {
            if td.is_nan() || t.is_nan() {
                *out = f64::NAN;
                return;
            }
            let value = relative_humidity_kelvin(td, t);
            if !value.is_finite() {
                unresolved += 1;
            }
            *out = value;
        });

    if unresolved > 0 {
        return Err(ProcessingError::Computation(format!(
            "relative humidity is non-finite for {} cell(s); check dewpoint/temperature units",
            unresolved
        )));
    }

    Ok(rh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_point() {
        let rh = relative_humidity_celsius(10.0, 20.0);
        assert!((45.0..=60.0).contains(&rh), "rh = {}", rh);

        let rh_k = relative_humidity_kelvin(283.15, 293.15);
        assert!((rh - rh_k).abs() < 1e-9);
    }

    #[test]
    fn test_saturated_air() {
        let rh = relative_humidity_celsius(25.0, 25.0);
        assert!((rh - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_shape_and_missing_cells() {
        let temp = Array3::from_shape_vec((1, 1, 3), vec![293.15, 300.0, f64::NAN]).unwrap();
        let dew = Array3::from_shape_vec((1, 1, 3), vec![283.15, 295.0, 290.0]).unwrap();

        let rh = relative_humidity(&dew, &temp).unwrap();
        assert_eq!(rh.dim(), (1, 1, 3));
        assert!(rh[[0, 0, 0]] > 45.0 && rh[[0, 0, 0]] < 60.0);
        assert!(rh[[0, 0, 1]] > 0.0 && rh[[0, 0, 1]] < 100.0);
        assert!(rh[[0, 0, 2]].is_nan());
    }

    #[test]
    fn test_shape_mismatch() {
        let temp = Array3::from_elem((1, 2, 2), 295.0);
        let dew = Array3::from_elem((1, 2, 1), 290.0);
        assert!(matches!(
            relative_humidity(&dew, &temp),
            Err(ProcessingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_unresolvable_input_is_computation_error() {
        // Just below the Magnus pole at -243.5 degC the exponent overflows
        let temp = Array3::from_elem((1, 1, 1), 295.0);
        let dew = Array3::from_elem((1, 1, 1), 29.55);
        assert!(matches!(
            relative_humidity(&dew, &temp),
            Err(ProcessingError::Computation(_))
        ));
    }
}
