// file: src/lib.rs
// description: library entry point and public api exports
// reference: rust library patterns
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/readme.md"))]

pub mod config;
pub mod error;
pub mod identifiers;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod utils;
pub mod workspace;

pub use config::{CommandSpec, Config, PipelineConfig, PipelineSettings, QualityCheckSpec, StagesConfig};
pub use error::{InputKind, PipelineError, Result};
pub use identifiers::{IdentifierAllocator, ResolvedSids};
pub use manifest::ManifestReader;
pub use pipeline::{
    ObserverSet, PipelineEvent, PipelineObserver, PipelineOrchestrator, PipelineState,
    ProgressObserver, RunReport, Stage, StagePlan, TracingObserver,
};
pub use report::RunSummary;
pub use stages::{
    CommandQualityCheck, CommandStage, ExtractionStage, QualityCheckStage, StageSet,
    VOLUMETRIC_REPORT_NAME, VolumetricStage,
};
pub use utils::{ArgTemplate, OperationTimer, Validator};
pub use workspace::{WorkspaceBuilder, WorkspaceLayout};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let config = Config::default_config();
        let _stages = StageSet::from_config(&config.stages);
        let _layout = WorkspaceLayout::for_root("/tmp/out");
    }
}
