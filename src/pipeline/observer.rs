// file: src/pipeline/observer.rs
// description: structured run events and the observers that consume them
// reference: https://docs.rs/tracing

use crate::pipeline::state::{PipelineState, Stage};
use crate::utils::format_duration;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// One notification per state machine transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted {
        scheduled: Vec<Stage>,
    },
    StageStarted {
        stage: Stage,
        position: usize,
        total: usize,
    },
    StageCompleted {
        stage: Stage,
        duration: Duration,
        artifact: Option<PathBuf>,
        detail: Option<String>,
    },
    StageSkipped {
        stage: Stage,
    },
    StageFailed {
        stage: Stage,
        from: PipelineState,
        state: PipelineState,
        duration: Duration,
        error: String,
    },
    RunCompleted {
        duration: Duration,
    },
}

pub trait PipelineObserver {
    fn on_event(&self, event: &PipelineEvent);
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for Arc<T> {
    fn on_event(&self, event: &PipelineEvent) {
        (**self).on_event(event)
    }
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for Box<T> {
    fn on_event(&self, event: &PipelineEvent) {
        (**self).on_event(event)
    }
}

/// Turns events into tracing records with `stage`, `duration_ms` and `outcome` fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { scheduled } => {
                let stages: Vec<&str> = scheduled.iter().map(|s| s.as_str()).collect();
                info!(stages = ?stages, "Starting MRI preprocessing pipeline");
            }
            PipelineEvent::StageStarted {
                stage,
                position,
                total,
            } => {
                info!(
                    stage = stage.as_str(),
                    position, total, "{}...", stage.description()
                );
            }
            PipelineEvent::StageCompleted {
                stage,
                duration,
                artifact,
                detail,
            } => {
                let artifact = artifact
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                info!(
                    stage = stage.as_str(),
                    duration_ms = duration.as_millis() as u64,
                    outcome = "completed",
                    artifact = %artifact,
                    detail = detail.as_deref().unwrap_or(""),
                    "Stage {} finished in {}",
                    stage,
                    format_duration(*duration)
                );
            }
            PipelineEvent::StageSkipped { stage } => {
                info!(
                    stage = stage.as_str(),
                    outcome = "skipped",
                    "Skipping {}",
                    stage.description().to_lowercase()
                );
            }
            PipelineEvent::StageFailed {
                stage,
                from,
                state,
                duration,
                error: message,
            } => {
                error!(
                    stage = stage.as_str(),
                    from = ?from,
                    state = ?state,
                    duration_ms = duration.as_millis() as u64,
                    outcome = "failed",
                    "Stage {} failed: {}",
                    stage,
                    message
                );
            }
            PipelineEvent::RunCompleted { duration } => {
                info!(
                    duration_ms = duration.as_millis() as u64,
                    outcome = "completed",
                    "MRI preprocessing pipeline finished in {}",
                    format_duration(*duration)
                );
            }
        }
    }
}

/// Fans every event out to each registered observer in order.
#[derive(Default)]
pub struct ObserverSet {
    observers: Vec<Box<dyn PipelineObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: impl PipelineObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }
}

impl PipelineObserver for ObserverSet {
    fn on_event(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
