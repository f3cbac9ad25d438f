// file: src/stages/mod.rs
// description: processing stage contracts and their command-backed implementations
// reference: internal module structure

pub mod command;
pub mod traits;

pub use command::{CommandQualityCheck, CommandStage};
pub use traits::{
    ExtractionStage, QualityCheckStage, StageSet, VOLUMETRIC_REPORT_NAME, VolumetricStage,
};
