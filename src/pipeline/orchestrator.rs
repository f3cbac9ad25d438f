// file: src/pipeline/orchestrator.rs
// description: drives workspace setup, SID resolution and the processing stages in order
// reference: sequential batch workflow over the stage transition table

use crate::config::{PipelineConfig, PipelineSettings};
use crate::error::{InputKind, PipelineError, Result};
use crate::identifiers::{IdentifierAllocator, ResolvedSids};
use crate::manifest::ManifestReader;
use crate::pipeline::observer::{PipelineEvent, PipelineObserver, TracingObserver};
use crate::pipeline::progress::StageRecord;
use crate::pipeline::state::{PipelineState, Stage, StagePlan, Step};
use crate::report::RunSummary;
use crate::stages::{StageSet, VOLUMETRIC_REPORT_NAME};
use crate::utils::{OperationTimer, Validator};
use crate::workspace::{WorkspaceBuilder, WorkspaceLayout};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;
use walkdir::WalkDir;

/// Everything a successful run produced, for the caller to report on.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub layout: WorkspaceLayout,
    pub subject_count: usize,
    pub sids: ResolvedSids,
    pub qc_report: PathBuf,
    pub volumetric_report: Option<PathBuf>,
    pub stages: Vec<StageRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub summary_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct RunContext {
    layout: Option<WorkspaceLayout>,
    subject_count: Option<usize>,
    sids: Option<ResolvedSids>,
    qc_report: Option<PathBuf>,
    volumetric_report: Option<PathBuf>,
    records: Vec<StageRecord>,
}

impl RunContext {
    fn layout(&self) -> Result<&WorkspaceLayout> {
        self.layout
            .as_ref()
            .ok_or_else(|| missing_prerequisite("workspace layout"))
    }

    fn subject_count(&self) -> Result<usize> {
        self.subject_count
            .ok_or_else(|| missing_prerequisite("subject count"))
    }

    fn sids(&self) -> Result<&ResolvedSids> {
        self.sids
            .as_ref()
            .ok_or_else(|| missing_prerequisite("subject identifiers"))
    }
}

fn missing_prerequisite(what: &str) -> PipelineError {
    PipelineError::Validation(format!("{} not available at this point of the run", what))
}

#[derive(Debug, Default)]
struct StageOutcome {
    artifact: Option<PathBuf>,
    detail: Option<String>,
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    settings: PipelineSettings,
    stages: StageSet,
    allocator: IdentifierAllocator,
    observer: Box<dyn PipelineObserver>,
}

impl PipelineOrchestrator {
    pub fn new(config: PipelineConfig, settings: PipelineSettings, stages: StageSet) -> Self {
        let allocator = IdentifierAllocator::new(settings.sid_file_name.clone());
        Self {
            config,
            settings,
            stages,
            allocator,
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl PipelineObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Runs every scheduled stage once, in order, stopping at the first failure.
    /// Nothing created before a failure is removed.
    pub fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let run_timer = OperationTimer::new("pipeline");

        let plan = StagePlan::new(self.config.volumetric_analysis);
        let scheduled = plan.scheduled();
        self.observer.on_event(&PipelineEvent::RunStarted {
            scheduled: scheduled.clone(),
        });

        let mut state = PipelineState::Init;
        let mut ctx = RunContext::default();

        loop {
            match plan.next(state) {
                Step::Run(stage) => {
                    let next = state.apply(stage)?;
                    let position = scheduled
                        .iter()
                        .position(|s| *s == stage)
                        .map_or(0, |i| i + 1);
                    self.observer.on_event(&PipelineEvent::StageStarted {
                        stage,
                        position,
                        total: scheduled.len(),
                    });

                    let timer = OperationTimer::new(stage.as_str());
                    match self.execute(stage, &mut ctx) {
                        Ok(outcome) => {
                            let duration = timer.finish();
                            ctx.records.push(StageRecord::new(
                                stage,
                                duration,
                                outcome.artifact.clone(),
                            ));
                            self.observer.on_event(&PipelineEvent::StageCompleted {
                                stage,
                                duration,
                                artifact: outcome.artifact,
                                detail: outcome.detail,
                            });
                            state = next;
                        }
                        Err(err) => {
                            let err = surface_error(stage, err);
                            let from = state;
                            state = state.fail();
                            self.observer.on_event(&PipelineEvent::StageFailed {
                                stage,
                                from,
                                state,
                                duration: timer.finish(),
                                error: err.to_string(),
                            });
                            return Err(err);
                        }
                    }
                }
                Step::Skip(stage) => {
                    self.observer.on_event(&PipelineEvent::StageSkipped { stage });
                    state = PipelineState::Complete;
                }
                Step::Finish => break,
            }
        }

        let layout = ctx.layout()?.clone();
        let subject_count = ctx.subject_count()?;
        let sids = ctx.sids()?.clone();
        let qc_report = ctx
            .qc_report
            .clone()
            .ok_or_else(|| missing_prerequisite("quality check report"))?;

        let mut report = RunReport {
            run_id,
            state: PipelineState::Complete,
            layout,
            subject_count,
            sids,
            qc_report,
            volumetric_report: ctx.volumetric_report,
            stages: ctx.records,
            started_at,
            finished_at: Utc::now(),
            duration: run_timer.finish(),
            summary_path: None,
        };

        if self.settings.write_run_summary {
            match RunSummary::from_report(&report, &self.config)
                .and_then(|summary| summary.write(&report.layout.text_dir))
            {
                Ok(path) => report.summary_path = Some(path),
                Err(e) => warn!(error = %e, "Could not write run summary"),
            }
        }

        self.observer.on_event(&PipelineEvent::RunCompleted {
            duration: report.duration,
        });

        Ok(report)
    }

    fn execute(&self, stage: Stage, ctx: &mut RunContext) -> Result<StageOutcome> {
        match stage {
            Stage::Workspace => {
                let layout = WorkspaceBuilder::build(&self.config.output_root)?;
                let artifact = Some(layout.root.clone());
                ctx.layout = Some(layout);
                Ok(StageOutcome {
                    artifact,
                    detail: None,
                })
            }
            Stage::Identifiers => {
                let count = self.subject_count()?;
                let layout = ctx.layout()?;
                let sids = self.allocator.resolve(
                    self.config.sid_source.as_deref(),
                    count,
                    &layout.text_dir,
                )?;
                let detail = if sids.generated {
                    format!("{} subjects, generated SIDs", count)
                } else {
                    format!("{} subjects, supplied SIDs", count)
                };
                let artifact = Some(sids.path.clone());
                ctx.subject_count = Some(count);
                ctx.sids = Some(sids);
                Ok(StageOutcome {
                    artifact,
                    detail: Some(detail),
                })
            }
            Stage::Extraction => {
                let layout = ctx.layout()?;
                self.stages.extraction.process(
                    &self.config.image_manifest,
                    &self.config.mask_manifest,
                    &layout.text_dir,
                    &layout.extraction_dir,
                    ctx.subject_count()?,
                )?;
                let files = count_files(&layout.extraction_dir);
                Ok(StageOutcome {
                    artifact: Some(layout.extraction_dir.clone()),
                    detail: Some(format!("{} files under extractions", files)),
                })
            }
            Stage::QualityCheck => {
                let report = self
                    .stages
                    .quality_check
                    .run_quality_check(&ctx.layout()?.text_dir)?;
                ctx.qc_report = Some(report.clone());
                Ok(StageOutcome {
                    artifact: Some(report),
                    detail: None,
                })
            }
            Stage::VolumetricAnalysis => {
                let text_dir = ctx.layout()?.text_dir.clone();
                self.stages.volumetric.compute_volumes(
                    &self.config.image_manifest,
                    &self.config.mask_manifest,
                    &ctx.sids()?.path,
                    &text_dir,
                )?;
                let report = text_dir.join(VOLUMETRIC_REPORT_NAME);
                ctx.volumetric_report = Some(report.clone());
                Ok(StageOutcome {
                    artifact: Some(report),
                    detail: None,
                })
            }
        }
    }

    /// Subject count from the image manifest, cross-checked against the mask
    /// manifest when the settings require it.
    fn subject_count(&self) -> Result<usize> {
        let images = ManifestReader::count(&self.config.image_manifest, InputKind::ImageManifest)?;

        if self.settings.require_matching_manifests {
            let masks = ManifestReader::count(&self.config.mask_manifest, InputKind::MaskManifest)?;
            if masks != images {
                return Err(PipelineError::ManifestMismatch { images, masks });
            }
        } else {
            Validator::require_input_file(&self.config.mask_manifest, InputKind::MaskManifest)?;
        }

        Ok(images)
    }
}

// Collaborator errors are opaque stage failures; setup errors keep their kind.
fn surface_error(stage: Stage, err: PipelineError) -> PipelineError {
    match (stage, err) {
        (_, err @ PipelineError::Stage { .. }) => err,
        (Stage::Workspace | Stage::Identifiers, err) => err,
        (stage, err) => PipelineError::stage(stage.as_str(), err.to_string()),
    }
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}
