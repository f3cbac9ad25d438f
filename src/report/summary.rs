// file: src/report/summary.rs
// description: json summary of a completed run written next to the other text outputs
// reference: https://docs.rs/serde_json

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::RunReport;
use crate::pipeline::progress::StageRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const RUN_SUMMARY_NAME: &str = "run_summary.json";

#[derive(Debug, Serialize)]
pub struct InputFingerprint {
    pub path: PathBuf,
    pub sha256: String,
}

impl InputFingerprint {
    pub fn compute(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(Self {
            path: path.to_path_buf(),
            sha256: format!("{:x}", hasher.finalize()),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
    pub image_manifest: InputFingerprint,
    pub mask_manifest: InputFingerprint,
    pub output_root: PathBuf,
    pub subject_count: usize,
    pub sid_file: PathBuf,
    pub sids_generated: bool,
    pub volumetric_analysis: bool,
    pub qc_report: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volumetric_report: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport, config: &PipelineConfig) -> Result<Self> {
        Ok(Self {
            run_id: report.run_id.to_string(),
            started_at: report.started_at.to_rfc3339(),
            finished_at: report.finished_at.to_rfc3339(),
            duration_ms: report.duration.as_millis() as u64,
            image_manifest: InputFingerprint::compute(&config.image_manifest)?,
            mask_manifest: InputFingerprint::compute(&config.mask_manifest)?,
            output_root: report.layout.root.clone(),
            subject_count: report.subject_count,
            sid_file: report.sids.path.clone(),
            sids_generated: report.sids.generated,
            volumetric_analysis: config.volumetric_analysis,
            qc_report: report.qc_report.clone(),
            volumetric_report: report.volumetric_report.clone(),
            stages: report.stages.clone(),
        })
    }

    pub fn write(&self, text_dir: &Path) -> Result<PathBuf> {
        let path = text_dir.join(RUN_SUMMARY_NAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "Wrote run summary");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_sha256_of_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nifti.txt");
        fs::write(&path, "abc").unwrap();

        let fingerprint = InputFingerprint::compute(&path).unwrap();
        assert_eq!(
            fingerprint.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(InputFingerprint::compute(&temp.path().join("gone.txt")).is_err());
    }
}
