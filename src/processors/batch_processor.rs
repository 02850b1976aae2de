use crate::error::{ProcessingError, Result};
use crate::models::ProcessingResult;
use crate::processors::pipeline::RiskPipeline;
use crate::readers::GridReader;
use crate::utils::filename::risk_output_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{GridSink, ParquetWriter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runs one independent pipeline per input file on a rayon pool.
pub struct BatchProcessor {
    max_workers: usize,
    pipeline: RiskPipeline,
    reader: GridReader,
    writer: ParquetWriter,
}

impl BatchProcessor {
    pub fn new(max_workers: usize, pipeline: RiskPipeline) -> Self {
        Self {
            max_workers: max_workers.max(1),
            pipeline,
            reader: GridReader::new(),
            writer: ParquetWriter::new(),
        }
    }

    pub fn with_writer(mut self, writer: ParquetWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_reader(mut self, reader: GridReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Parquet files directly inside `dir`, sorted by path
    pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(ProcessingError::SourceUnreadable {
                path: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }

        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_parquet = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
            if path.is_file() && is_parquet {
                inputs.push(path);
            }
        }
        inputs.sort();
        Ok(inputs)
    }

    /// Process every input, writing `<stem>-risk.parquet` into `output_dir`.
    ///
    /// A failed file does not stop the batch; its result carries the error.
    /// Results are returned in input order.
    pub fn process_files(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<ProcessingResult>> {
        let total = inputs.len();
        let processed_count = Arc::new(AtomicUsize::new(0));

        if let Some(p) = progress {
            p.set_message(&format!("Processing {} files...", total));
        }

        std::fs::create_dir_all(output_dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let results: Vec<ProcessingResult> = pool.install(|| {
            inputs
                .par_iter()
                .map(|input| {
                    let output = risk_output_filename(input, output_dir);
                    let result = self.pipeline.process_file(
                        &self.reader,
                        input,
                        Some((&self.writer as &dyn GridSink, output.as_path())),
                    );

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }
                    tracing::debug!("{}/{} {}", count, total, input.display());

                    result
                })
                .collect()
        });

        let failed = results.iter().filter(|r| !r.success()).count();
        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Processed {} files ({} failed)",
                total, failed
            ));
        }
        tracing::info!("batch finished: {} succeeded, {} failed", total - failed, failed);

        Ok(results)
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get(), RiskPipeline::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.parquet", "a.PARQUET", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let inputs = BatchProcessor::collect_inputs(dir.path()).unwrap();
        let names: Vec<_> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PARQUET", "b.parquet"]);
    }

    #[test]
    fn test_collect_inputs_missing_dir() {
        let err = BatchProcessor::collect_inputs(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ProcessingError::SourceUnreadable { .. }));
    }

    #[test]
    fn test_failed_files_do_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("corrupt.parquet");
        std::fs::write(&bad, b"not parquet").unwrap();
        let missing = dir.path().join("missing.parquet");

        let processor = BatchProcessor::new(2, RiskPipeline::default());
        let results = processor
            .process_files(&[bad.clone(), missing], &dir.path().join("out"), None)
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success()));
        assert_eq!(results[0].input_path(), Some(bad.as_path()));
    }
}
