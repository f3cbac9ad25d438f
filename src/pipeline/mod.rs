// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod orchestrator;
pub mod observer;
pub mod progress;
pub mod state;

pub use observer::{ObserverSet, PipelineEvent, PipelineObserver, TracingObserver};
pub use orchestrator::{PipelineOrchestrator, RunReport};
pub use progress::{ProgressObserver, StageRecord};
pub use state::{PipelineState, Stage, StagePlan, Step};
