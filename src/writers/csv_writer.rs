use crate::error::Result;
use crate::models::LocationTimeseries;
use std::io::Write;
use std::path::Path;

/// Writes location time series as `time,<var1>,<var2>,...` CSV.
pub struct CsvWriter {
    time_format: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            time_format: "%Y-%m-%dT%H:%M:%S".to_string(),
        }
    }

    pub fn with_time_format(mut self, format: &str) -> Self {
        self.time_format = format.to_string();
        self
    }

    pub fn write_timeseries(&self, series: &LocationTimeseries, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_to(series, file)
    }

    pub fn write_to<W: Write>(&self, series: &LocationTimeseries, out: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(out);

        let mut header = vec!["time".to_string()];
        header.extend(series.columns.iter().cloned());
        writer.write_record(&header)?;

        for row in &series.rows {
            let mut record = vec![row.time.format(&self.time_format).to_string()];
            // Missing averages are written as empty fields
            record.extend(row.values.iter().map(|v| {
                if v.is_nan() {
                    String::new()
                } else {
                    v.to_string()
                }
            }));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocationQuery, TimeseriesRow};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_csv_layout() -> Result<()> {
        let series = LocationTimeseries {
            query: LocationQuery::new(0.0, 36.0, 1.0),
            cells_selected: 4,
            columns: vec!["malaria_risk_index".to_string(), "precip_risk".to_string()],
            rows: vec![
                TimeseriesRow {
                    time: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                    values: vec![0.5, 1.0],
                },
                TimeseriesRow {
                    time: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                    values: vec![0.25, f64::NAN],
                },
            ],
        };

        let mut buffer = Vec::new();
        CsvWriter::new().write_to(&series, &mut buffer)?;
        let text = String::from_utf8(buffer).unwrap();

        assert_eq!(
            text,
            "time,malaria_risk_index,precip_risk\n\
             2024-01-01T00:00:00,0.5,1\n\
             2024-01-02T00:00:00,0.25,\n"
        );
        Ok(())
    }
}
