//! Stage executor with a two-level existence check

use floodmap_core::error::Result;
use floodmap_core::models::{StageError, StageKind, StageResult, StageStatus};
use floodmap_core::workspace::{input_readable, output_present};
use std::path::PathBuf;
use std::time::Instant;

type Producer<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;
type Precondition<'a> = Box<dyn Fn() -> bool + 'a>;

/// One unit of work with declared inputs and outputs
pub struct StageDescriptor<'a> {
    pub stage: StageKind,
    pub label: String,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    precondition: Option<Precondition<'a>>,
    producer: Producer<'a>,
}

impl<'a> StageDescriptor<'a> {
    pub fn new(
        stage: StageKind,
        label: impl Into<String>,
        producer: impl FnOnce() -> Result<()> + 'a,
    ) -> Self {
        Self {
            stage,
            label: label.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            precondition: None,
            producer: Box::new(producer),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Extra check that must hold, beyond the declared inputs being readable
    pub fn with_precondition(mut self, check: impl Fn() -> bool + 'a) -> Self {
        self.precondition = Some(Box::new(check));
        self
    }

    /// Skip status the executor would report right now, or `None` if it would run
    pub fn pending_skip(&self) -> Option<StageStatus> {
        let inputs_ok = self.inputs.iter().all(|p| input_readable(p));
        let extra_ok = self.precondition.as_ref().map(|check| check()).unwrap_or(true);
        if !inputs_ok || !extra_ok {
            return Some(StageStatus::SkippedMissingInput);
        }

        if !self.outputs.is_empty() && self.outputs.iter().all(|p| output_present(p)) {
            return Some(StageStatus::SkippedAlreadyDone);
        }

        None
    }
}

/// Run a stage unless its inputs are missing or its outputs already exist
///
/// The producer is invoked at most once and never retried.
pub fn run_stage(descriptor: StageDescriptor<'_>) -> StageResult {
    let started = Instant::now();
    let skip = descriptor.pending_skip();
    let StageDescriptor { stage, label, inputs, outputs, producer, .. } = descriptor;

    match skip {
        Some(StageStatus::SkippedMissingInput) => {
            let missing: Vec<String> = inputs
                .iter()
                .filter(|p| !input_readable(p))
                .map(|p| p.display().to_string())
                .collect();
            tracing::info!(stage = %label, missing = ?missing, "Skipping stage: inputs not available");
            return StageResult::new(stage, label, StageStatus::SkippedMissingInput)
                .with_outputs(outputs);
        }
        Some(status) => {
            tracing::info!(stage = %label, "Skipping stage: outputs already present");
            return StageResult::new(stage, label, status).with_outputs(outputs);
        }
        None => {}
    }

    tracing::info!(stage = %label, outputs = outputs.len(), "Running stage");

    let mut result = match producer() {
        Ok(()) => {
            let missing: Vec<PathBuf> =
                outputs.iter().filter(|p| !output_present(p)).cloned().collect();
            if missing.is_empty() {
                StageResult::new(stage, &label, StageStatus::Completed)
            } else {
                tracing::error!(stage = %label, missing = missing.len(), "Stage left declared outputs missing");
                StageResult::new(stage, &label, StageStatus::Failed)
                    .with_error(StageError::IncompleteOutput { missing })
            }
        }
        Err(e) => {
            tracing::error!(stage = %label, error = %e, "Stage failed");
            StageResult::new(stage, &label, StageStatus::Failed)
                .with_error(StageError::Producer { message: e.to_string() })
        }
    };

    result.outputs = outputs;
    result.elapsed_ms = started.elapsed().as_millis() as u64;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use floodmap_core::FloodError;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_skips_without_invoking_producer() {
        let dir = TempDir::new().unwrap();
        let called = Cell::new(false);

        let result = run_stage(
            StageDescriptor::new(StageKind::Scale, "scale HH", || {
                called.set(true);
                Ok(())
            })
            .with_inputs(vec![dir.path().join("absent.grd")])
            .with_outputs(vec![dir.path().join("out.grd")]),
        );

        assert_eq!(result.status, StageStatus::SkippedMissingInput);
        assert!(!called.get());
    }

    #[test]
    fn test_false_precondition_skips() {
        let result = run_stage(
            StageDescriptor::new(StageKind::Merge, "merge", || Ok(())).with_precondition(|| false),
        );
        assert_eq!(result.status, StageStatus::SkippedMissingInput);
    }

    #[test]
    fn test_second_run_is_skipped_and_output_untouched() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.grd");
        let output = dir.path().join("out.grd");
        fs::write(&input, "x").unwrap();

        let produce = |content: &'static str| {
            let output = output.clone();
            move || -> Result<()> {
                fs::write(&output, content)?;
                Ok(())
            }
        };

        let first = run_stage(
            StageDescriptor::new(StageKind::Filter, "filter HH", produce("first"))
                .with_inputs(vec![input.clone()])
                .with_outputs(vec![output.clone()]),
        );
        assert_eq!(first.status, StageStatus::Completed);

        let second = run_stage(
            StageDescriptor::new(StageKind::Filter, "filter HH", produce("second"))
                .with_inputs(vec![input.clone()])
                .with_outputs(vec![output.clone()]),
        );
        assert_eq!(second.status, StageStatus::SkippedAlreadyDone);
        assert_eq!(fs::read_to_string(&output).unwrap(), "first");
    }

    #[test]
    fn test_producer_error_is_reported() {
        let result = run_stage(StageDescriptor::new(StageKind::Import, "import scene", || {
            Err(FloodError::toolkit("import", "corrupt metadata"))
        }));

        assert_eq!(result.status, StageStatus::Failed);
        match result.error {
            Some(StageError::Producer { message }) => assert!(message.contains("corrupt metadata")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_output_counts_as_incomplete() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.grd");
        let target = output.clone();

        let result = run_stage(
            StageDescriptor::new(StageKind::Ortho, "ortho scene", move || {
                fs::write(&target, "")?;
                Ok(())
            })
            .with_outputs(vec![output.clone()]),
        );

        assert_eq!(result.status, StageStatus::Failed);
        assert_eq!(result.error, Some(StageError::IncompleteOutput { missing: vec![output] }));
    }
}
