use crate::output::OutputWriter;
use floodmap_core::models::StageStatus;
use floodmap_pipeline::PlannedStage;
use serde::Serialize;

/// Represents a planned action in dry-run mode
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub description: String,
    pub details: Vec<String>,
    /// Status a real run would report without executing, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_skip: Option<StageStatus>,
}

/// Types of actions that can be planned
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    CreateDirectory,
    CreateFile,
    RunStage,
}

impl PlannedAction {
    /// Create a new planned action
    pub fn new(action_type: ActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            details: Vec::new(),
            would_skip: None,
        }
    }

    /// Add a detail to the planned action
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    /// One pipeline unit with its declared outputs
    pub fn from_stage(planned: &PlannedStage) -> Self {
        let mut action = Self::new(ActionType::RunStage, format!("[{}] {}", planned.stage, planned.label));
        for output in &planned.outputs {
            action = action.with_detail(format!("writes {}", output.display()));
        }
        action.would_skip = planned.skip;
        action
    }
}

/// Display planned actions in dry-run mode
pub fn display_planned_actions(output: &OutputWriter, actions: &[PlannedAction]) {
    if output.is_json() {
        let _ = output.result(serde_json::json!({
            "dry_run": true,
            "planned_actions": actions,
        }));
    } else {
        output.section("Planned Actions (Dry Run)");
        for (i, action) in actions.iter().enumerate() {
            let suffix = action
                .would_skip
                .map(|status| format!(" -> {}", status))
                .unwrap_or_default();
            output.info(format!("{}. {}{}", i + 1, action.description, suffix));
            for detail in &action.details {
                output.info(format!("   - {}", detail));
            }
        }
        output.info("\nNo changes were made. Run without --dry-run to execute these actions.");
    }
}
