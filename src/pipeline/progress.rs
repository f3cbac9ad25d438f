// file: src/pipeline/progress.rs
// description: per-stage timing records and a terminal spinner driven by run events
// reference: uses indicatif for progress display and tracks stage durations

use crate::pipeline::observer::{PipelineEvent, PipelineObserver};
use crate::pipeline::state::Stage;
use crate::utils::format_duration;
use crate::utils::logging::{format_error, format_skipped, format_step, format_success};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
}

impl StageRecord {
    pub fn new(stage: Stage, duration: Duration, artifact: Option<PathBuf>) -> Self {
        Self {
            stage,
            duration_ms: duration.as_millis() as u64,
            artifact,
        }
    }
}

/// Shows a spinner for the running stage. Draws nothing when stderr is not a terminal.
pub struct ProgressObserver {
    colored: bool,
    current: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    pub fn new(colored: bool) -> Self {
        Self {
            colored,
            current: Mutex::new(None),
        }
    }

    fn start(&self, message: String) {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style(self.colored));
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut current) = self.current.lock()
            && let Some(previous) = current.replace(bar)
        {
            previous.finish_and_clear();
        }
    }

    // Prints a one-off status line without a spinner and leaves the running bar alone.
    fn note(&self, message: String) {
        let line = ProgressBar::new_spinner();
        line.set_style(note_style());
        line.finish_with_message(message);
    }

    fn finish(&self, message: String, abandon: bool) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(bar) = current.take() {
            if abandon {
                bar.abandon_with_message(message);
            } else {
                bar.finish_with_message(message);
            }
        }
    }
}

impl PipelineObserver for ProgressObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::StageStarted {
                stage,
                position,
                total,
            } => self.start(format_step(*position, *total, stage.description())),
            PipelineEvent::StageCompleted {
                stage, duration, ..
            } => self.finish(
                format_success(&format!("{} ({})", stage, format_duration(*duration))),
                false,
            ),
            PipelineEvent::StageFailed { stage, .. } => {
                self.finish(format_error(&format!("{} failed", stage)), true)
            }
            PipelineEvent::StageSkipped { stage } => {
                self.note(format_skipped(&format!("{} skipped", stage)))
            }
            PipelineEvent::RunStarted { .. } | PipelineEvent::RunCompleted { .. } => {}
        }
    }
}

impl Drop for ProgressObserver {
    fn drop(&mut self) {
        if let Ok(mut current) = self.current.lock()
            && let Some(bar) = current.take()
        {
            bar.finish_and_clear();
        }
    }
}

fn spinner_style(colored: bool) -> ProgressStyle {
    let template = if colored {
        "{spinner:.green} [{elapsed_precise}] {msg}"
    } else {
        "{spinner} [{elapsed_precise}] {msg}"
    };
    ProgressStyle::default_spinner()
        .template(template)
        .expect("Failed to create spinner template")
}

fn note_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").expect("Failed to create note template")
}
