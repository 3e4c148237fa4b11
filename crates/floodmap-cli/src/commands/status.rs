//! Status command implementation

use crate::cli::StatusArgs;
use crate::config_loader::{load_workspace_config, open_workspace};
use crate::output::OutputWriter;
use crate::output_types::{ConfigRow, LastRunStatus, StageDirRow, StageRow, StatusOutput};
use anyhow::Result;
use floodmap_core::models::{StageDir, StageStatus};
use floodmap_core::RunWorkspace;
use floodmap_pipeline::{latest_report, PipelineResult};
use std::fs;

pub fn execute(args: StatusArgs, output: &OutputWriter) -> Result<()> {
    let workspace = open_workspace(&args.workspace)?;

    let stage_dirs = stage_dir_rows(&workspace);
    let last_run = latest_report(&workspace.stage_path(StageDir::Logs))?
        .map(|report| last_run_status(&report, args.verbose));
    let config = if args.verbose {
        Some(config_rows(&workspace)?)
    } else {
        None
    };

    if output.is_json() {
        let json_output = StatusOutput {
            workspace_path: workspace.root().display().to_string(),
            stage_dirs,
            last_run,
            config,
        };
        return output.result(json_output);
    }

    output.section("Workspace Status");
    output.kv("Location", workspace.root().display());
    output.table(stage_dirs);

    output.section("Last Run");
    match last_run {
        Some(run) => {
            output.kv("Status", &run.status);
            output.kv("Finished At", run.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
            output.kv("Completed", run.completed);
            output.kv("Skipped", run.skipped);
            output.kv("Failed", run.failed);
            output.kv("Warnings", run.warnings);
            if let Some(stages) = run.stages {
                output.table(stages);
            }
        }
        None => {
            output.kv("Status", "Never run");
            output.info("Run 'floodmap run' to process the scenes in Raw");
        }
    }

    if let Some(config) = config {
        output.section("Configuration");
        output.table(config);
    }

    Ok(())
}

fn stage_dir_rows(workspace: &RunWorkspace) -> Vec<StageDirRow> {
    StageDir::ALL
        .iter()
        .map(|stage| {
            let path = workspace.stage_path(*stage);
            let files = fs::read_dir(&path)
                .map(|entries| entries.filter_map(|e| e.ok()).count())
                .unwrap_or(0);
            StageDirRow {
                name: stage.dir_name().to_string(),
                present: path.is_dir(),
                files,
            }
        })
        .collect()
}

fn last_run_status(report: &PipelineResult, verbose: bool) -> LastRunStatus {
    LastRunStatus {
        status: report.status.as_str().to_string(),
        finished_at: report.finished_at,
        completed: report.count(StageStatus::Completed),
        skipped: report.stages.iter().filter(|s| s.status.is_skipped()).count(),
        failed: report.count(StageStatus::Failed),
        warnings: report.warnings.len(),
        stages: verbose.then(|| {
            report
                .stages
                .iter()
                .map(|s| StageRow {
                    stage: s.stage.to_string(),
                    label: s.label.clone(),
                    status: s.status.to_string(),
                })
                .collect()
        }),
    }
}

fn config_rows(workspace: &RunWorkspace) -> Result<Vec<ConfigRow>> {
    let config = load_workspace_config(workspace)?;
    let mut rows: Vec<ConfigRow> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| ConfigRow {
            key,
            value,
            source: format!("{:?}", source),
        })
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_dirs_report_presence_and_counts() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::init(dir.path()).unwrap();
        fs::write(dir.path().join("OWFEP/a.geojson"), "{}").unwrap();
        fs::write(dir.path().join("OWFEP/b.geojson"), "{}").unwrap();

        let rows = stage_dir_rows(&workspace);

        assert_eq!(rows.len(), StageDir::ALL.len());
        let owfep = rows.iter().find(|r| r.name == "OWFEP").unwrap();
        assert!(owfep.present);
        assert_eq!(owfep.files, 2);
        let scratch = rows.iter().find(|r| r.name == "Scratch").unwrap();
        assert!(!scratch.present);
    }

    #[test]
    fn test_config_rows_are_sorted_with_sources() {
        let dir = TempDir::new().unwrap();
        let workspace = RunWorkspace::init(dir.path()).unwrap();

        let rows = config_rows(&workspace).unwrap();

        assert!(rows.windows(2).all(|w| w[0].key <= w[1].key));
        let hole = rows.iter().find(|r| r.key == "hole_size").unwrap();
        assert_eq!(hole.value, "2.5 ha");
    }
}
