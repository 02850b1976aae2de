use crate::error::{ProcessingError, Result};

/// Map a longitude onto the -180..180 convention.
///
/// # Examples
/// ```
/// use malaria_risk_processor::utils::to_signed_longitude;
///
/// assert_eq!(to_signed_longitude(350.0), -10.0);
/// assert_eq!(to_signed_longitude(36.8), 36.8);
/// ```
pub fn to_signed_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

/// Map a longitude onto the 0..360 convention used by ERA5 grids.
pub fn to_positive_longitude(lon: f64) -> f64 {
    if lon < 0.0 {
        lon + 360.0
    } else {
        lon
    }
}

/// Express `lon` in the same convention as the grid longitudes.
pub fn align_longitude(lon: f64, grid_uses_360: bool) -> f64 {
    if grid_uses_360 {
        to_positive_longitude(lon)
    } else {
        to_signed_longitude(lon)
    }
}

/// Indices of the axis values lying within `buffer` of `center`.
pub fn indices_within(axis: &[f64], center: f64, buffer: f64) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, &value)| (value - center).abs() <= buffer)
        .map(|(i, _)| i)
        .collect()
}

/// Indices of the longitudes lying within `buffer` of `center`, measured
/// the short way round the globe so a buffer may cross the 0/360 or
/// -180/180 seam.
pub fn longitude_indices_within(axis: &[f64], center: f64, buffer: f64) -> Vec<usize> {
    axis.iter()
        .enumerate()
        .filter(|(_, &value)| longitude_distance(value, center) <= buffer)
        .map(|(i, _)| i)
        .collect()
}

/// Angular separation of two longitudes in degrees, in [0, 180].
pub fn longitude_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Position of `value` in a sorted, de-duplicated coordinate axis.
pub fn axis_index(axis: &[f64], value: f64) -> Result<usize> {
    axis.binary_search_by(|candidate| candidate.total_cmp(&value))
        .map_err(|_| {
            ProcessingError::InvalidFormat(format!("Coordinate {} not found on axis", value))
        })
}

/// Sorted unique axis from raw coordinate values.
pub fn unique_sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut axis: Vec<f64> = values.into_iter().collect();
    axis.sort_by(|a, b| a.total_cmp(b));
    axis.dedup_by(|a, b| a.total_cmp(b).is_eq());
    axis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longitude_conventions() {
        assert_eq!(to_signed_longitude(190.0), -170.0);
        assert_eq!(to_signed_longitude(-20.0), -20.0);
        assert_eq!(to_positive_longitude(-20.0), 340.0);
        assert_eq!(align_longitude(-1.0, true), 359.0);
        assert_eq!(align_longitude(359.0, false), -1.0);
        assert_eq!(align_longitude(36.0, true), 36.0);
    }

    #[test]
    fn test_indices_within() {
        let axis = [0.0, 0.5, 1.0, 1.5, 2.0];
        assert_eq!(indices_within(&axis, 1.0, 0.5), vec![1, 2, 3]);
        assert!(indices_within(&axis, 10.0, 1.0).is_empty());
    }

    #[test]
    fn test_longitude_buffer_crosses_seam() {
        let positive = [0.0, 0.5, 1.0, 180.0, 358.5, 359.0, 359.5];
        assert_eq!(longitude_indices_within(&positive, 359.5, 1.0), vec![0, 1, 4, 5, 6]);
        assert_eq!(longitude_indices_within(&positive, 0.0, 1.0), vec![0, 1, 2, 5, 6]);

        let signed = [-180.0, -179.5, 0.0, 179.0, 179.5];
        assert_eq!(longitude_indices_within(&signed, 179.75, 0.5), vec![0, 4]);

        assert_eq!(longitude_distance(359.0, 1.0), 2.0);
        assert_eq!(longitude_distance(-180.0, 180.0), 0.0);
    }

    #[test]
    fn test_unique_sorted_and_lookup() {
        let axis = unique_sorted(vec![2.0, 1.0, 2.0, -1.0, 1.0]);
        assert_eq!(axis, vec![-1.0, 1.0, 2.0]);
        assert_eq!(axis_index(&axis, 2.0).unwrap(), 2);
        assert!(axis_index(&axis, 1.5).is_err());
    }
}
