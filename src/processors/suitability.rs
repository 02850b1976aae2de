//! Piecewise suitability functions mapping a physical quantity to [0, 1].
//!
//! The breakpoints are calibration values from vector biology. The
//! precipitation and humidity curves are deliberately asymmetric and must
//! not be smoothed.

use ndarray::{Array, Dimension};

use crate::models::RiskThresholds;
use crate::utils::constants::{
    HUMIDITY_PLATEAU_RISK, PRECIP_FLOOD_RISK, PRECIP_FLOOD_THRESHOLD_MM, PRECIP_FLOOR_RISK,
};

/// Temperature suitability for a temperature in degC. NaN stays NaN.
pub fn temperature_suitability(temp_c: f64, thresholds: &RiskThresholds) -> f64 {
    if temp_c.is_nan() {
        return f64::NAN;
    }

    let t_min = thresholds.temp_min_threshold();
    let opt_min = thresholds.temp_optimal_min();
    let opt_max = thresholds.temp_optimal_max();
    let t_max = thresholds.temp_max_threshold();

    if temp_c <= t_min || temp_c >= t_max {
        0.0
    } else if temp_c < opt_min {
        (temp_c - t_min) / (opt_min - t_min)
    } else if temp_c <= opt_max {
        1.0
    } else {
        (t_max - temp_c) / (t_max - opt_max)
    }
}

/// Thermal units above `base`; no upper cap.
pub fn growing_degree_days(temp_c: f64, base: f64) -> f64 {
    if temp_c.is_nan() {
        return f64::NAN;
    }
    (temp_c - base).max(0.0)
}

/// Precipitation risk for a period total in mm.
///
/// Zero below the monthly minimum, a floor signal at the minimum rising to 1
/// at the optimum, decaying back to 0 at twice the optimum, then climbing to a
/// flood-regime plateau of 0.5.
pub fn precipitation_risk(precip_mm: f64, thresholds: &RiskThresholds) -> f64 {
    if precip_mm.is_nan() {
        return f64::NAN;
    }

    let p_min = thresholds.precip_min_monthly();
    let p_opt = thresholds.precip_optimal();
    let p_excess = 2.0 * p_opt;

    if precip_mm <= 0.0 || precip_mm < p_min {
        0.0
    } else if precip_mm < p_opt {
        PRECIP_FLOOR_RISK + (1.0 - PRECIP_FLOOR_RISK) * (precip_mm - p_min) / (p_opt - p_min)
    } else if precip_mm <= p_excess {
        1.0 - (precip_mm - p_opt) / p_opt
    } else if precip_mm < PRECIP_FLOOD_THRESHOLD_MM {
        PRECIP_FLOOD_RISK * (precip_mm - p_excess) / (PRECIP_FLOOD_THRESHOLD_MM - p_excess)
    } else {
        PRECIP_FLOOD_RISK
    }
}

/// Humidity risk for relative humidity in percent; plateaus at 0.9.
pub fn humidity_risk(rh_percent: f64, thresholds: &RiskThresholds) -> f64 {
    if rh_percent.is_nan() {
        return f64::NAN;
    }

    let h_min = thresholds.humidity_min();
    let h_opt = thresholds.humidity_optimal();

    if rh_percent <= h_min {
        0.0
    } else if rh_percent < h_opt {
        HUMIDITY_PLATEAU_RISK * (rh_percent - h_min) / (h_opt - h_min)
    } else {
        HUMIDITY_PLATEAU_RISK
    }
}

pub fn temperature_suitability_array<D: Dimension>(
    temp_c: &Array<f64, D>,
    thresholds: &RiskThresholds,
) -> Array<f64, D> {
    temp_c.mapv(|t| temperature_suitability(t, thresholds))
}

pub fn growing_degree_days_array<D: Dimension>(temp_c: &Array<f64, D>, base: f64) -> Array<f64, D> {
    temp_c.mapv(|t| growing_degree_days(t, base))
}

pub fn precipitation_risk_array<D: Dimension>(
    precip_mm: &Array<f64, D>,
    thresholds: &RiskThresholds,
) -> Array<f64, D> {
    precip_mm.mapv(|p| precipitation_risk(p, thresholds))
}

pub fn humidity_risk_array<D: Dimension>(
    rh_percent: &Array<f64, D>,
    thresholds: &RiskThresholds,
) -> Array<f64, D> {
    rh_percent.mapv(|h| humidity_risk(h, thresholds))
}
