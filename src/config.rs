// file: src/config.rs
// description: application settings with toml support and the resolved run configuration
// reference: https://docs.rs/config

use crate::error::{PipelineError, Result};
use crate::utils::Validator;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_SID_FILE_NAME: &str = "sids.txt";
pub const DEFAULT_QC_REPORT_NAME: &str = "segmentation_qc.csv";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub stages: StagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_true")]
    pub require_matching_manifests: bool,
    #[serde(default = "default_sid_file_name")]
    pub sid_file_name: String,
    #[serde(default = "default_true")]
    pub write_run_summary: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StagesConfig {
    #[serde(default = "default_extraction_command")]
    pub extraction: CommandSpec,
    #[serde(default = "default_quality_check")]
    pub quality_check: QualityCheckSpec,
    #[serde(default = "default_volumetric_command")]
    pub volumetric: CommandSpec,
}

/// An external program invocation. Arguments may contain `{placeholder}` tokens.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct QualityCheckSpec {
    #[serde(flatten)]
    pub command: CommandSpec,
    #[serde(default = "default_qc_report_name")]
    pub report_name: String,
}

/// Resolved configuration for a single run. Built once from the command line
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub image_manifest: PathBuf,
    pub mask_manifest: PathBuf,
    pub output_root: PathBuf,
    pub sid_source: Option<PathBuf>,
    pub volumetric_analysis: bool,
}

impl PipelineConfig {
    pub fn new(
        image_manifest: impl Into<PathBuf>,
        mask_manifest: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image_manifest: image_manifest.into(),
            mask_manifest: mask_manifest.into(),
            output_root: output_root.into(),
            sid_source: None,
            volumetric_analysis: false,
        }
    }

    pub fn with_sid_source(mut self, sid_source: Option<PathBuf>) -> Self {
        self.sid_source = sid_source;
        self
    }

    pub fn with_volumetric_analysis(mut self, enabled: bool) -> Self {
        self.volumetric_analysis = enabled;
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_sid_file_name() -> String {
    DEFAULT_SID_FILE_NAME.to_string()
}

fn default_qc_report_name() -> String {
    DEFAULT_QC_REPORT_NAME.to_string()
}

fn python_script(script: &str, args: &[&str]) -> CommandSpec {
    let mut full_args = vec![script.to_string()];
    full_args.extend(args.iter().map(|a| a.to_string()));
    CommandSpec {
        program: "python3".to_string(),
        args: full_args,
        working_dir: None,
        env: HashMap::new(),
    }
}

fn default_extraction_command() -> CommandSpec {
    python_script(
        "src/extract_all.py",
        &[
            "--nifti",
            "{image_manifest}",
            "--mask",
            "{mask_manifest}",
            "--text-dir",
            "{text_dir}",
            "--output",
            "{extraction_dir}",
            "--count",
            "{subject_count}",
        ],
    )
}

fn default_quality_check() -> QualityCheckSpec {
    QualityCheckSpec {
        command: python_script(
            "src/segment_qc.py",
            &["--text-dir", "{text_dir}", "--report", "{report_path}"],
        ),
        report_name: default_qc_report_name(),
    }
}

fn default_volumetric_command() -> CommandSpec {
    python_script(
        "src/volume_check.py",
        &[
            "--nifti",
            "{image_manifest}",
            "--mask",
            "{mask_manifest}",
            "--sid",
            "{sid_file}",
            "--text-dir",
            "{text_dir}",
        ],
    )
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            require_matching_manifests: true,
            sid_file_name: default_sid_file_name(),
            write_run_summary: true,
        }
    }
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            extraction: default_extraction_command(),
            quality_check: default_quality_check(),
            volumetric: default_volumetric_command(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv().ok();

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        } else {
            builder = builder.add_source(
                config::File::from(Path::new("config/default.toml")).required(false),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MRI_PREP")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            stages: StagesConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !Validator::is_bare_file_name(&self.pipeline.sid_file_name) {
            return Err(PipelineError::Config(format!(
                "sid_file_name must be a bare file name, got '{}'",
                self.pipeline.sid_file_name
            )));
        }

        let commands = [
            ("extraction", &self.stages.extraction),
            ("quality_check", &self.stages.quality_check.command),
            ("volumetric", &self.stages.volumetric),
        ];
        for (name, command) in commands {
            if command.program.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "stages.{}.program must not be empty",
                    name
                )));
            }
        }

        if !Validator::is_bare_file_name(&self.stages.quality_check.report_name) {
            return Err(PipelineError::Config(format!(
                "stages.quality_check.report_name must be a bare file name, got '{}'",
                self.stages.quality_check.report_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
        assert!(config.pipeline.require_matching_manifests);
        assert_eq!(config.pipeline.sid_file_name, "sids.txt");
        assert_eq!(config.stages.quality_check.report_name, DEFAULT_QC_REPORT_NAME);
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.toml");
        fs::write(
            &path,
            r#"
[pipeline]
require_matching_manifests = false

[stages.quality_check]
program = "qc-tool"
args = ["{text_dir}"]
report_name = "qc.csv"
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert!(!config.pipeline.require_matching_manifests);
        assert!(config.pipeline.write_run_summary);
        assert_eq!(config.stages.quality_check.command.program, "qc-tool");
        assert_eq!(config.stages.quality_check.report_name, "qc.csv");
        assert_eq!(config.stages.extraction.program, "python3");
    }

    #[test]
    fn test_sid_file_name_must_be_bare() {
        let mut config = Config::default_config();
        config.pipeline.sid_file_name = "nested/sids.txt".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = Config::default_config();
        config.stages.volumetric.program = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new("n.txt", "m.txt", "/tmp/out")
            .with_sid_source(Some(PathBuf::from("sids.txt")))
            .with_volumetric_analysis(true);
        assert_eq!(config.sid_source, Some(PathBuf::from("sids.txt")));
        assert!(config.volumetric_analysis);
    }
}
