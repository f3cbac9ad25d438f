// file: src/main.rs
// description: commandline application entry point
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use mri_prep::utils::logging::{format_error, format_success, init_logger};
use mri_prep::{
    Config, ObserverSet, PipelineConfig, PipelineOrchestrator, ProgressObserver, StageSet,
    TracingObserver,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "mri_prep")]
#[command(version)]
#[command(
    about = "Brain MRI preprocessing: segmentation extraction, QC and volumetric analysis",
    long_about = None
)]
struct Cli {
    /// Text file listing the original NIfTI image paths, one per line
    #[arg(long, value_name = "FILE")]
    nifti: PathBuf,

    /// Text file listing the segmentation mask paths, one per line
    #[arg(long, value_name = "FILE")]
    mask: PathBuf,

    /// Root of the output workspace
    #[arg(long, value_name = "DIR")]
    output: PathBuf,

    /// Text file listing subject identifiers; generated as 0..N-1 when omitted
    #[arg(long, value_name = "FILE")]
    sid: Option<PathBuf>,

    /// Run volumetric analysis on the extracted segmentations
    #[arg(
        long,
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    va: bool,

    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.nifti, &self.mask, &self.output)
            .with_sid_source(self.sid.clone())
            .with_volumetric_analysis(self.va)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let colored = cli.color && std::io::stderr().is_terminal();

    init_logger(colored, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    let run_config = cli.pipeline_config();
    let observers = ObserverSet::new()
        .with(TracingObserver)
        .with(ProgressObserver::new(colored));

    let orchestrator = PipelineOrchestrator::new(
        run_config,
        config.pipeline.clone(),
        StageSet::from_config(&config.stages),
    )
    .with_observer(observers);

    match orchestrator.run() {
        Ok(report) => {
            info!("Quality check file saved to {}", report.qc_report.display());
            if let Some(volumes) = &report.volumetric_report {
                info!("Volumetric analysis file saved to {}", volumes.display());
            }
            eprintln!(
                "{}",
                format_success(&format!(
                    "MRI preprocessing finished for {} subjects in {}",
                    report.subject_count,
                    report.layout.root.display()
                ))
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error("MRI preprocessing failed"));
            Err(e).context("Pipeline run failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "mri_prep", "--nifti", "n.txt", "--mask", "m.txt", "--output", "/tmp/run1",
        ])
        .unwrap();

        let config = cli.pipeline_config();
        assert_eq!(config.sid_source, None);
        assert!(!config.volumetric_analysis);
        assert_eq!(config.output_root, PathBuf::from("/tmp/run1"));
    }

    #[test]
    fn test_cli_volumetric_flag_forms() {
        let base = ["mri_prep", "--nifti", "n.txt", "--mask", "m.txt", "--output", "o"];

        let bare = Cli::try_parse_from(base.iter().copied().chain(["--va"])).unwrap();
        assert!(bare.va);

        let explicit = Cli::try_parse_from(base.iter().copied().chain(["--va=true"])).unwrap();
        assert!(explicit.va);

        let off = Cli::try_parse_from(base.iter().copied().chain(["--va=false"])).unwrap();
        assert!(!off.va);
    }

    #[test]
    fn test_cli_requires_inputs() {
        assert!(Cli::try_parse_from(["mri_prep", "--nifti", "n.txt"]).is_err());
    }

    #[test]
    fn test_cli_sid_source() {
        let cli = Cli::try_parse_from([
            "mri_prep", "--nifti", "n.txt", "--mask", "m.txt", "--output", "o", "--sid",
            "custom_sids.txt",
        ])
        .unwrap();
        assert_eq!(
            cli.pipeline_config().sid_source,
            Some(PathBuf::from("custom_sids.txt"))
        );
    }
}
