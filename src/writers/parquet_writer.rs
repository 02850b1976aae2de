use crate::error::Result;
use crate::models::GridDataset;
use crate::utils::constants::{
    COL_LATITUDE, COL_LONGITUDE, COL_TIME, COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE,
    COMPRESSION_SNAPPY, COMPRESSION_ZSTD, DEFAULT_ROW_GROUP_SIZE, UNITS_METADATA_KEY,
};
use arrow::array::{ArrayRef, Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use ndarray::Axis;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Persists a gridded dataset.
pub trait GridSink: Send + Sync {
    fn write(&self, dataset: &GridDataset, path: &Path) -> Result<()>;
}

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(crate::error::ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write the dataset in long format, one record batch per time step.
    pub fn write_grid(&self, dataset: &GridDataset, path: &Path) -> Result<()> {
        let schema = self.create_schema(dataset);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
        for t in 0..dataset.coords().time.len() {
            let batch = self.time_step_to_batch(dataset, t, schema.clone())?;
            writer.write(&batch)?;
        }
        writer.close()?;

        tracing::info!(
            "wrote {} variable(s) over {:?} cells to {}",
            dataset.variables().len(),
            dataset.shape(),
            path.display()
        );
        Ok(())
    }

    /// Arrow schema: coordinates followed by one Float64 column per variable
    fn create_schema(&self, dataset: &GridDataset) -> Arc<Schema> {
        let mut fields = vec![
            Field::new(
                COL_TIME,
                DataType::Timestamp(TimeUnit::Millisecond, None),
                false,
            ),
            Field::new(COL_LATITUDE, DataType::Float64, false),
            Field::new(COL_LONGITUDE, DataType::Float64, false),
        ];

        for variable in dataset.variables() {
            let metadata =
                HashMap::from([(UNITS_METADATA_KEY.to_string(), variable.units.clone())]);
            fields.push(
                Field::new(variable.name.as_str(), DataType::Float64, true).with_metadata(metadata),
            );
        }

        Arc::new(Schema::new(fields))
    }

    fn time_step_to_batch(
        &self,
        dataset: &GridDataset,
        t: usize,
        schema: Arc<Schema>,
    ) -> Result<RecordBatch> {
        let coords = dataset.coords();
        let n_cells = coords.latitude.len() * coords.longitude.len();
        let millis = coords.time[t].and_utc().timestamp_millis();

        let mut latitudes = Vec::with_capacity(n_cells);
        let mut longitudes = Vec::with_capacity(n_cells);
        for &lat in &coords.latitude {
            for &lon in &coords.longitude {
                latitudes.push(lat);
                longitudes.push(lon);
            }
        }

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(TimestampMillisecondArray::from(vec![millis; n_cells])),
            Arc::new(Float64Array::from(latitudes)),
            Arc::new(Float64Array::from(longitudes)),
        ];

        for variable in dataset.variables() {
            // Row-major (lat, lon) order matches the coordinate columns above
            let values: Vec<f64> = variable.data.index_axis(Axis(0), t).iter().copied().collect();
            columns.push(Arc::new(Float64Array::from(values)));
        }

        Ok(RecordBatch::try_new(schema, columns)?)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();
        let columns = file_metadata
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut row_group_sizes = Vec::new();
        for i in 0..row_groups {
            let rg_metadata = metadata.row_group(i);
            row_group_sizes.push(rg_metadata.num_rows());
        }

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            columns,
            compression: self.compression,
        })
    }
}

impl GridSink for ParquetWriter {
    fn write(&self, dataset: &GridDataset, path: &Path) -> Result<()> {
        self.write_grid(dataset, path)
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub columns: Vec<String>,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Columns: {}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0, // Convert to MB
            self.columns.join(", "),
            self.total_rows as f64 / self.row_groups.max(1) as f64
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GridCoordinates;
    use chrono::NaiveDate;
    use ndarray::Array3;
    use tempfile::NamedTempFile;

    fn small_grid() -> GridDataset {
        let time = vec![
            NaiveDate::from_ymd_opt(2023, 7, 15).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2023, 7, 16).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        ];
        let coords = GridCoordinates::new(time, vec![-1.0, 0.0], vec![36.0, 37.0]);
        let mut dataset = GridDataset::new(coords).unwrap();
        dataset
            .insert_array("t2m", "K", Array3::from_elem((2, 2, 2), 298.0))
            .unwrap();
        dataset
    }

    #[test]
    fn test_write_grid_row_count() -> Result<()> {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        writer.write_grid(&small_grid(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 8);
        assert_eq!(info.columns, vec!["time", "latitude", "longitude", "t2m"]);
        assert!(info.summary().contains("Total rows: 8"));

        Ok(())
    }

    #[test]
    fn test_row_group_size_splits_file() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(4);
        let temp_file = NamedTempFile::new().unwrap();

        writer.write_grid(&small_grid(), temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.row_groups, 2);
        assert_eq!(info.row_group_sizes, vec![4, 4]);
        assert_eq!(ParquetWriter::new().with_row_group_size(0).row_group_size, 1);

        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let compressions = ["snappy", "gzip", "lz4", "zstd", "none"];

        for compression in &compressions {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new().unwrap();

            let result = writer.write_grid(&small_grid(), temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9000").is_err());
        Ok(())
    }
}
