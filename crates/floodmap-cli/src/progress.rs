use floodmap_core::models::StageStatus;
use floodmap_pipeline::PipelineProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner for indeterminate progress
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner following pipeline units as they run
///
/// Completed and failed units are printed above the spinner; skips only
/// update the message.
pub struct RunProgress {
    spinner: ProgressBar,
    completed: usize,
}

impl RunProgress {
    pub fn new() -> Self {
        Self {
            spinner: create_spinner("Preparing workspace..."),
            completed: 0,
        }
    }

    pub fn update(&mut self, event: &PipelineProgress) {
        match event.status {
            None => self.spinner.set_message(format!("[{}] {}", event.stage, event.label)),
            Some(StageStatus::Completed) => {
                self.completed += 1;
                self.spinner.println(format!("✓ [{}] {}", event.stage, event.label));
            }
            Some(StageStatus::Failed) => {
                self.spinner.println(format!("✗ [{}] {}", event.stage, event.label));
            }
            Some(status) => {
                self.spinner.set_message(format!("[{}] {} {}", event.stage, event.label, status));
            }
        }
    }

    pub fn finish(self) {
        self.spinner.finish_with_message(format!("✓ {} unit(s) completed", self.completed));
    }
}
