use chrono::{Datelike, NaiveDate, NaiveDateTime};
use ndarray::{Array2, Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{ProcessingError, Result};
use crate::models::{GridCoordinates, GridDataset, GridVariable};
use crate::utils::constants::{
    VAR_DEWPOINT, VAR_PRECIPITATION, VAR_TEMPERATURE, VAR_TEMPERATURE_MAX,
    VAR_TEMPERATURE_MAX_CELSIUS, VAR_TEMPERATURE_MIN, VAR_TEMPERATURE_MIN_CELSIUS,
};

/// How a variable collapses many time steps into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reducer {
    Mean,
    Max,
    Min,
    Sum,
}

impl Reducer {
    /// Reduce a stack of time slices along axis 0, skipping NaN.
    /// Cells with no valid observation stay NaN.
    fn reduce(&self, slices: ArrayView3<f64>) -> Array2<f64> {
        match self {
            Reducer::Max => slices.fold_axis(Axis(0), f64::NAN, |acc, &v| acc.max(v)),
            Reducer::Min => slices.fold_axis(Axis(0), f64::NAN, |acc, &v| acc.min(v)),
            Reducer::Mean | Reducer::Sum => {
                let counts = slices.map_axis(Axis(0), |lane| {
                    lane.iter().filter(|v| !v.is_nan()).count()
                });
                let sums = slices.map_axis(Axis(0), |lane| {
                    lane.iter().filter(|v| !v.is_nan()).sum::<f64>()
                });

                let mut out = Array2::<f64>::zeros(sums.dim());
                ndarray::Zip::from(&mut out)
                    .and(&sums)
                    .and(&counts)
                    .for_each(|o, &s, &n| {
                        *o = if n == 0 {
                            f64::NAN
                        } else if *self == Reducer::Mean {
                            s / n as f64
                        } else {
                            s
                        };
                    });
                out
            }
        }
    }
}

impl std::str::FromStr for Reducer {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mean" => Ok(Reducer::Mean),
            "max" => Ok(Reducer::Max),
            "min" => Ok(Reducer::Min),
            "sum" => Ok(Reducer::Sum),
            _ => Err(ProcessingError::Config(format!("Unknown reducer: {}", s))),
        }
    }
}

/// Target resolution of the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeResolution {
    Daily,
    Monthly,
}

impl TimeResolution {
    fn bucket_start(&self, time: NaiveDateTime) -> NaiveDateTime {
        let date = match self {
            TimeResolution::Daily => time.date(),
            TimeResolution::Monthly => {
                NaiveDate::from_ymd_opt(time.year(), time.month(), 1).unwrap_or(time.date())
            }
        };
        date.and_time(chrono::NaiveTime::MIN)
    }
}

impl std::str::FromStr for TimeResolution {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "daily" | "day" => Ok(TimeResolution::Daily),
            "monthly" | "month" => Ok(TimeResolution::Monthly),
            _ => Err(ProcessingError::Config(format!(
                "Unknown time resolution: {}",
                s
            ))),
        }
    }
}

/// Mapping from variable name to reducer, with a fallback for unlisted names.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerTable {
    reducers: HashMap<String, Reducer>,
    default: Reducer,
}

impl Default for ReducerTable {
    fn default() -> Self {
        let reducers = [
            (VAR_TEMPERATURE, Reducer::Mean),
            (VAR_DEWPOINT, Reducer::Mean),
            (VAR_TEMPERATURE_MAX, Reducer::Max),
            (VAR_TEMPERATURE_MIN, Reducer::Min),
            (VAR_TEMPERATURE_MAX_CELSIUS, Reducer::Max),
            (VAR_TEMPERATURE_MIN_CELSIUS, Reducer::Min),
            (VAR_PRECIPITATION, Reducer::Sum),
        ]
        .into_iter()
        .map(|(name, reducer)| (name.to_string(), reducer))
        .collect();

        Self {
            reducers,
            default: Reducer::Mean,
        }
    }
}

impl ReducerTable {
    pub fn with_reducer(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        self.reducers.insert(name.into(), reducer);
        self
    }

    pub fn with_default(mut self, reducer: Reducer) -> Self {
        self.default = reducer;
        self
    }

    pub fn reducer_for(&self, name: &str) -> Reducer {
        self.reducers.get(name).copied().unwrap_or(self.default)
    }
}

pub struct TemporalAggregator {
    resolution: TimeResolution,
    reducers: ReducerTable,
}

impl TemporalAggregator {
    pub fn new(resolution: TimeResolution) -> Self {
        Self {
            resolution,
            reducers: ReducerTable::default(),
        }
    }

    pub fn with_reducers(mut self, reducers: ReducerTable) -> Self {
        self.reducers = reducers;
        self
    }

    pub fn resolution(&self) -> TimeResolution {
        self.resolution
    }

    /// Collapse the time axis into buckets; spatial axes and units pass through.
    pub fn aggregate(&self, dataset: &GridDataset) -> Result<GridDataset> {
        let coords = dataset.coords();

        let mut buckets: BTreeMap<NaiveDateTime, Vec<usize>> = BTreeMap::new();
        for (index, &time) in coords.time.iter().enumerate() {
            buckets
                .entry(self.resolution.bucket_start(time))
                .or_default()
                .push(index);
        }

        let (_, n_lat, n_lon) = coords.shape();
        let n_out = buckets.len();

        // Resolve every variable's reducer once
        let plan: Vec<(&GridVariable, Reducer)> = dataset
            .variables()
            .iter()
            .map(|v| (v, self.reducers.reducer_for(&v.name)))
            .collect();

        let mut variables = Vec::with_capacity(plan.len());
        for (variable, reducer) in plan {
            let mut out = Array3::<f64>::zeros((n_out, n_lat, n_lon));
            for (bucket, indices) in buckets.values().enumerate() {
                let slices = variable.data.select(Axis(0), indices);
                out.index_axis_mut(Axis(0), bucket)
                    .assign(&reducer.reduce(slices.view()));
            }

            tracing::debug!(
                "aggregated {} with {:?}: {} -> {} steps",
                variable.name,
                reducer,
                coords.time.len(),
                n_out
            );
            variables.push(GridVariable::new(
                variable.name.clone(),
                variable.units.clone(),
                out,
            ));
        }

        let new_coords = GridCoordinates::new(
            buckets.keys().copied().collect(),
            coords.latitude.clone(),
            coords.longitude.clone(),
        );

        GridDataset::with_parts(new_coords, variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hourly_dataset(days: usize) -> GridDataset {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let steps = days * 24;
        let time = (0..steps)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect();
        let coords = GridCoordinates::new(time, vec![0.0, 1.0], vec![10.0, 11.0]);
        let mut dataset = GridDataset::new(coords).unwrap();

        let values = |offset: f64| {
            Array3::from_shape_fn((steps, 2, 2), |(t, i, j)| {
                offset + (t % 24) as f64 + i as f64 + 0.5 * j as f64
            })
        };
        dataset.insert_array("t2m", "K", values(280.0)).unwrap();
        dataset.insert_array("mx2t", "K", values(285.0)).unwrap();
        dataset.insert_array("mn2t", "K", values(275.0)).unwrap();
        dataset
    }

    #[test]
    fn test_hourly_to_daily_reducers() {
        let dataset = hourly_dataset(1);
        let daily = TemporalAggregator::new(TimeResolution::Daily)
            .aggregate(&dataset)
            .unwrap();

        assert_eq!(daily.shape(), (1, 2, 2));

        let hours: Vec<f64> = (0..24).map(|h| h as f64).collect();
        let mean = hours.iter().sum::<f64>() / 24.0;

        assert!((daily.data("t2m").unwrap()[[0, 0, 0]] - (280.0 + mean)).abs() < 1e-9);
        assert_eq!(daily.data("mx2t").unwrap()[[0, 0, 0]], 285.0 + 23.0);
        assert_eq!(daily.data("mn2t").unwrap()[[0, 0, 0]], 275.0);
        assert_eq!(daily.data("mx2t").unwrap()[[0, 1, 1]], 285.0 + 23.0 + 1.5);
        assert_eq!(daily.variable("t2m").unwrap().units, "K");
    }

    #[test]
    fn test_multi_day_bucketing() {
        let dataset = hourly_dataset(3);
        let daily = TemporalAggregator::new(TimeResolution::Daily)
            .aggregate(&dataset)
            .unwrap();

        assert_eq!(daily.coords().time.len(), 3);
        assert_eq!(
            daily.coords().time[1],
            NaiveDate::from_ymd_opt(2024, 3, 2)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );

        let monthly = TemporalAggregator::new(TimeResolution::Monthly)
            .aggregate(&dataset)
            .unwrap();
        assert_eq!(monthly.coords().time.len(), 1);
    }

    #[test]
    fn test_sum_and_nan_handling() {
        let time = vec![
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap(),
        ];
        let coords = GridCoordinates::new(time, vec![0.0], vec![0.0, 1.0]);
        let mut dataset = GridDataset::new(coords).unwrap();
        dataset
            .insert_array(
                "tp",
                "m",
                Array3::from_shape_vec((2, 1, 2), vec![0.002, f64::NAN, 0.003, f64::NAN]).unwrap(),
            )
            .unwrap();

        let daily = TemporalAggregator::new(TimeResolution::Daily)
            .aggregate(&dataset)
            .unwrap();
        let tp = daily.data("tp").unwrap();
        assert!((tp[[0, 0, 0]] - 0.005).abs() < 1e-12);
        assert!(tp[[0, 0, 1]].is_nan());
    }

    #[test]
    fn test_reducer_table_overrides() {
        let table = ReducerTable::default()
            .with_reducer("t2m", Reducer::Max)
            .with_default(Reducer::Min);

        assert_eq!(table.reducer_for("t2m"), Reducer::Max);
        assert_eq!(table.reducer_for("mn2t"), Reducer::Min);
        assert_eq!(table.reducer_for("temp_suitability"), Reducer::Min);
        assert_eq!(ReducerTable::default().reducer_for("anything"), Reducer::Mean);
    }

    #[test]
    fn test_celsius_extremes_keep_their_reducers() {
        let table = ReducerTable::default();
        assert_eq!(table.reducer_for("mx2t_celsius"), Reducer::Max);
        assert_eq!(table.reducer_for("mn2t_celsius"), Reducer::Min);
        assert_eq!(table.reducer_for("t2m_celsius"), Reducer::Mean);
    }

    #[test]
    fn test_parse_options() {
        assert_eq!("Daily".parse::<TimeResolution>().unwrap(), TimeResolution::Daily);
        assert_eq!("max".parse::<Reducer>().unwrap(), Reducer::Max);
        assert!("hourly".parse::<TimeResolution>().is_err());
    }
}
