use arrow::array::{Array, Float64Array, TimestampMillisecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use ndarray::Array3;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use std::path::Path;

use crate::error::{ProcessingError, Result};
use crate::models::{GridCoordinates, GridDataset, GridVariable};
use crate::utils::constants::{
    COL_LATITUDE, COL_LONGITUDE, COL_TIME, DEFAULT_BATCH_SIZE, UNITS_METADATA_KEY,
};
use crate::utils::coordinates::{axis_index, unique_sorted};

/// Loads a gridded dataset from storage.
pub trait GridSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<GridDataset>;
}

/// Reads long-format Parquet grids: one row per (time, latitude, longitude)
/// cell and one numeric column per variable. Units come from the `units`
/// field metadata; cells absent from the file are NaN.
pub struct GridReader {
    batch_size: usize,
}

struct RawColumns {
    time: Vec<NaiveDateTime>,
    latitude: Vec<f64>,
    longitude: Vec<f64>,
    variables: Vec<(String, String, Vec<f64>)>,
}

impl GridReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Read a grid file, wrapping any failure as `SourceUnreadable`.
    pub fn read_grid(&self, path: &Path) -> Result<GridDataset> {
        self.read_grid_inner(path)
            .map_err(|e| match e {
                ProcessingError::SourceUnreadable { .. } => e,
                other => ProcessingError::SourceUnreadable {
                    path: path.display().to_string(),
                    message: other.to_string(),
                },
            })
    }

    fn read_grid_inner(&self, path: &Path) -> Result<GridDataset> {
        let file = File::open(path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

        let schema = builder.schema().clone();
        for required in [COL_TIME, COL_LATITUDE, COL_LONGITUDE] {
            if schema.field_with_name(required).is_err() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "missing coordinate column '{}'",
                    required
                )));
            }
        }

        let variable_fields: Vec<(String, String)> = schema
            .fields()
            .iter()
            .filter(|f| ![COL_TIME, COL_LATITUDE, COL_LONGITUDE].contains(&f.name().as_str()))
            .filter(|f| f.data_type().is_numeric())
            .map(|f| {
                let units = f
                    .metadata()
                    .get(UNITS_METADATA_KEY)
                    .cloned()
                    .unwrap_or_default();
                (f.name().clone(), units)
            })
            .collect();

        let mut raw = RawColumns {
            time: Vec::new(),
            latitude: Vec::new(),
            longitude: Vec::new(),
            variables: variable_fields
                .into_iter()
                .map(|(name, units)| (name, units, Vec::new()))
                .collect(),
        };

        let reader = builder.with_batch_size(self.batch_size).build()?;
        for batch in reader {
            self.append_batch(&batch?, &mut raw)?;
        }

        if raw.time.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "{} contains no grid cells",
                path.display()
            )));
        }

        let dataset = Self::assemble(raw)?;
        tracing::info!(
            "loaded {} with shape {:?} and variables [{}]",
            path.display(),
            dataset.shape(),
            dataset.variable_names().join(", ")
        );
        Ok(dataset)
    }

    fn append_batch(&self, batch: &RecordBatch, raw: &mut RawColumns) -> Result<()> {
        let times = cast(
            Self::column(batch, COL_TIME)?,
            &DataType::Timestamp(TimeUnit::Millisecond, None),
        )?;
        let times = times
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .ok_or_else(|| ProcessingError::InvalidFormat("Invalid time column type".to_string()))?;

        for i in 0..times.len() {
            if times.is_null(i) {
                return Err(ProcessingError::InvalidFormat(
                    "Null value in time column".to_string(),
                ));
            }
            let time = DateTime::from_timestamp_millis(times.value(i))
                .ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!(
                        "Timestamp out of range: {}",
                        times.value(i)
                    ))
                })?
                .naive_utc();
            raw.time.push(time);
        }

        raw.latitude
            .extend(Self::float_values(Self::column(batch, COL_LATITUDE)?)?);
        raw.longitude
            .extend(Self::float_values(Self::column(batch, COL_LONGITUDE)?)?);

        for (name, _, values) in raw.variables.iter_mut() {
            values.extend(Self::float_values(Self::column(batch, name)?)?);
        }

        Ok(())
    }

    fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a std::sync::Arc<dyn Array>> {
        batch
            .column_by_name(name)
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing column '{}'", name)))
    }

    /// Cast any numeric column to f64; nulls become NaN.
    fn float_values(array: &std::sync::Arc<dyn Array>) -> Result<Vec<f64>> {
        let cast_array = cast(array, &DataType::Float64)?;
        let floats = cast_array
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| ProcessingError::InvalidFormat("Expected numeric column".to_string()))?;

        Ok((0..floats.len())
            .map(|i| {
                if floats.is_null(i) {
                    f64::NAN
                } else {
                    floats.value(i)
                }
            })
            .collect())
    }

    fn assemble(raw: RawColumns) -> Result<GridDataset> {
        let mut time_axis = raw.time.clone();
        time_axis.sort();
        time_axis.dedup();
        let lat_axis = unique_sorted(raw.latitude.iter().copied());
        let lon_axis = unique_sorted(raw.longitude.iter().copied());

        let shape = (time_axis.len(), lat_axis.len(), lon_axis.len());

        // Row -> (t, i, j) cell index, resolved once for all variables
        let mut cells = Vec::with_capacity(raw.time.len());
        for row in 0..raw.time.len() {
            let t = time_axis
                .binary_search(&raw.time[row])
                .map_err(|_| ProcessingError::InvalidFormat("Unindexed time".to_string()))?;
            let i = axis_index(&lat_axis, raw.latitude[row])?;
            let j = axis_index(&lon_axis, raw.longitude[row])?;
            cells.push((t, i, j));
        }

        let coords = GridCoordinates::new(time_axis, lat_axis, lon_axis);
        let mut dataset = GridDataset::new(coords)?;

        for (name, units, values) in raw.variables {
            let mut data = Array3::<f64>::from_elem(shape, f64::NAN);
            for (&cell, &value) in cells.iter().zip(values.iter()) {
                data[cell] = value;
            }
            dataset.insert(GridVariable::new(name, units, data))?;
        }

        Ok(dataset)
    }
}

impl GridSource for GridReader {
    fn load(&self, path: &Path) -> Result<GridDataset> {
        self.read_grid(path)
    }
}

impl Default for GridReader {
    fn default() -> Self {
        Self::new()
    }
}
