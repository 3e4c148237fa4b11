//! Stage executor idempotence with real toolkit producers

mod common;

use common::*;
use floodmap_core::models::{StageKind, StageStatus};
use floodmap_core::ports::RasterToolkit;
use floodmap_pipeline::{run_stage, StageDescriptor};
use std::path::Path;
use tempfile::TempDir;

fn scale_stage<'a>(toolkit: &'a RecordingToolkit, input: &'a Path, output: &'a Path) -> StageDescriptor<'a> {
    StageDescriptor::new(StageKind::Scale, "scale HH", move || toolkit.scale_to_byte(input, 0, output))
        .with_inputs(vec![input.to_path_buf()])
        .with_outputs(vec![output.to_path_buf()])
}

#[test]
fn test_rerun_is_skipped_and_output_untouched() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("channel.grd");
    let output = dir.path().join("scaled.grd");
    scene_imagery().write(&input).unwrap();
    let toolkit = RecordingToolkit::new();

    let first = run_stage(scale_stage(&toolkit, &input, &output));
    assert_eq!(first.status, StageStatus::Completed);
    let before = snapshot(&output);

    let second = run_stage(scale_stage(&toolkit, &input, &output));

    assert_eq!(second.status, StageStatus::SkippedAlreadyDone);
    assert_eq!(snapshot(&output), before);
    assert_eq!(toolkit.calls().len(), 1);
}

#[test]
fn test_unreadable_input_skips_toolkit() {
    let dir = TempDir::new().unwrap();
    let toolkit = RecordingToolkit::new();
    let input = dir.path().join("absent.grd");
    let output = dir.path().join("scaled.grd");

    let result = run_stage(scale_stage(&toolkit, &input, &output));

    assert_eq!(result.status, StageStatus::SkippedMissingInput);
    assert!(toolkit.calls().is_empty());
    assert!(!output.exists());
}

#[test]
fn test_toolkit_error_fails_stage() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("channel.grd");
    std::fs::write(&input, "garbage").unwrap();
    let output = dir.path().join("scaled.grd");
    let toolkit = RecordingToolkit::new();

    let result = run_stage(scale_stage(&toolkit, &input, &output));

    assert_eq!(result.status, StageStatus::Failed);
    assert!(result.error.is_some());
    assert!(!output.exists());
}
