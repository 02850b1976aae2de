use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ErrorKind, ProcessingError};

/// Orchestrator states. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Loading,
    Transforming,
    Aggregating,
    Finalizing,
    Succeeded,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Succeeded | PipelineStage::Failed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Loading => "loading",
            PipelineStage::Transforming => "transforming",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Finalizing => "finalizing",
            PipelineStage::Succeeded => "succeeded",
            PipelineStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Terminal artifact of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    success: bool,
    variables_processed: Vec<String>,
    indices_calculated: Vec<String>,
    duration: Duration,
    error: Option<String>,
    error_kind: Option<ErrorKind>,
    failed_stage: Option<PipelineStage>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
}

impl ProcessingResult {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn variables_processed(&self) -> &[String] {
        &self.variables_processed
    }

    pub fn indices_calculated(&self) -> &[String] {
        &self.indices_calculated
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    pub fn failed_stage(&self) -> Option<PipelineStage> {
        self.failed_stage
    }

    pub fn input_path(&self) -> Option<&Path> {
        self.input_path.as_deref()
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Processing Result ===\n");
        if let Some(input) = &self.input_path {
            summary.push_str(&format!("Input: {}\n", input.display()));
        }
        summary.push_str(&format!(
            "Status: {}\n",
            if self.success { "succeeded" } else { "failed" }
        ));
        summary.push_str(&format!(
            "Duration: {:.3}s\n",
            self.duration.as_secs_f64()
        ));
        summary.push_str(&format!(
            "Variables processed: {}\n",
            self.variables_processed.join(", ")
        ));
        summary.push_str(&format!(
            "Indices calculated: {}\n",
            self.indices_calculated.join(", ")
        ));

        if let Some(output) = &self.output_path {
            summary.push_str(&format!("Output: {}\n", output.display()));
        }

        if let Some(error) = &self.error {
            let kind = self
                .error_kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "Unknown".to_string());
            let stage = self
                .failed_stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            summary.push_str(&format!("Error [{} during {}]: {}\n", kind, stage, error));
        }

        summary
    }
}

/// Incrementally populated while a run progresses; finalized exactly once.
#[derive(Debug)]
pub(crate) struct ResultAccumulator {
    stage: PipelineStage,
    variables_processed: Vec<String>,
    indices_calculated: Vec<String>,
    input_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
}

impl ResultAccumulator {
    pub(crate) fn new() -> Self {
        Self {
            stage: PipelineStage::Idle,
            variables_processed: Vec::new(),
            indices_calculated: Vec::new(),
            input_path: None,
            output_path: None,
        }
    }

    pub(crate) fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub(crate) fn enter(&mut self, stage: PipelineStage) {
        tracing::debug!("pipeline stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    pub(crate) fn record_variable(&mut self, name: &str) {
        if !self.variables_processed.iter().any(|v| v == name) {
            self.variables_processed.push(name.to_string());
        }
    }

    pub(crate) fn record_index(&mut self, name: &str) {
        if !self.indices_calculated.iter().any(|v| v == name) {
            self.indices_calculated.push(name.to_string());
        }
    }

    pub(crate) fn set_input(&mut self, path: &Path) {
        self.input_path = Some(path.to_path_buf());
    }

    pub(crate) fn set_output(&mut self, path: &Path) {
        self.output_path = Some(path.to_path_buf());
    }

    pub(crate) fn succeed(mut self, duration: Duration) -> ProcessingResult {
        self.enter(PipelineStage::Succeeded);
        ProcessingResult {
            success: true,
            variables_processed: self.variables_processed,
            indices_calculated: self.indices_calculated,
            duration,
            error: None,
            error_kind: None,
            failed_stage: None,
            input_path: self.input_path,
            output_path: self.output_path,
        }
    }

    pub(crate) fn fail(mut self, error: &ProcessingError, duration: Duration) -> ProcessingResult {
        let failed_stage = self.stage;
        self.enter(PipelineStage::Failed);
        ProcessingResult {
            success: false,
            variables_processed: self.variables_processed,
            indices_calculated: self.indices_calculated,
            duration,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            failed_stage: Some(failed_stage),
            input_path: self.input_path,
            output_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_keeps_completed_names() {
        let mut acc = ResultAccumulator::new();
        acc.enter(PipelineStage::Transforming);
        acc.record_variable("temp_suitability");
        acc.record_variable("temp_suitability");

        let err = ProcessingError::missing_variable("d2m");
        let result = acc.fail(&err, Duration::from_millis(5));

        assert!(!result.success());
        assert_eq!(result.variables_processed(), &["temp_suitability".to_string()]);
        assert_eq!(result.error_kind(), Some(ErrorKind::MissingVariable));
        assert_eq!(result.failed_stage(), Some(PipelineStage::Transforming));
        assert!(result.error().unwrap().contains("d2m"));
        assert!(result.summary().contains("MissingVariable during transforming"));
    }

    #[test]
    fn test_success_result_serializes() {
        let mut acc = ResultAccumulator::new();
        acc.record_index("malaria_risk_index");
        let result = acc.succeed(Duration::from_millis(12));

        assert!(result.success());
        assert!(result.error().is_none());
        let json = result.to_json().unwrap();
        assert!(json.contains("malaria_risk_index"));
    }

    #[test]
    fn test_terminal_stages() {
        assert!(PipelineStage::Succeeded.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Aggregating.is_terminal());
    }
}
