// file: src/stages/traits.rs
// description: collaborator contracts the orchestrator drives
// reference: internal module structure

use crate::error::Result;
use std::path::{Path, PathBuf};

/// File name the volumetric stage writes inside the text directory.
pub const VOLUMETRIC_REPORT_NAME: &str = "volumetic_analysis.csv";

/// Extracts segmented regions from paired image/mask manifests.
///
/// Per-subject outputs go under `extraction_dir`; any auxiliary manifests the
/// later stages need go under `text_dir`.
pub trait ExtractionStage {
    fn process(
        &self,
        image_manifest: &Path,
        mask_manifest: &Path,
        text_dir: &Path,
        extraction_dir: &Path,
        subject_count: usize,
    ) -> Result<()>;
}

/// Checks what extraction left in `text_dir` and returns the aggregate report path.
pub trait QualityCheckStage {
    fn run_quality_check(&self, text_dir: &Path) -> Result<PathBuf>;
}

/// Computes per-subject volumes into `text_dir/VOLUMETRIC_REPORT_NAME`.
pub trait VolumetricStage {
    fn compute_volumes(
        &self,
        image_manifest: &Path,
        mask_manifest: &Path,
        sid_file: &Path,
        text_dir: &Path,
    ) -> Result<()>;
}

/// The three collaborators for one run.
pub struct StageSet {
    pub extraction: Box<dyn ExtractionStage>,
    pub quality_check: Box<dyn QualityCheckStage>,
    pub volumetric: Box<dyn VolumetricStage>,
}

impl StageSet {
    pub fn new(
        extraction: impl ExtractionStage + 'static,
        quality_check: impl QualityCheckStage + 'static,
        volumetric: impl VolumetricStage + 'static,
    ) -> Self {
        Self {
            extraction: Box::new(extraction),
            quality_check: Box::new(quality_check),
            volumetric: Box::new(volumetric),
        }
    }
}
