// file: src/stages/command.rs
// description: stage collaborators backed by configured external programs
// reference: https://doc.rust-lang.org/std/process/struct.Command.html

use crate::config::{CommandSpec, QualityCheckSpec, StagesConfig};
use crate::error::{PipelineError, Result};
use crate::pipeline::Stage;
use crate::stages::traits::{
    ExtractionStage, QualityCheckStage, StageSet, VOLUMETRIC_REPORT_NAME, VolumetricStage,
};
use crate::utils::{ArgTemplate, Validator};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

const STDERR_TAIL_BYTES: usize = 2000;
const STDERR_TAIL_LINES: usize = 50;

/// Runs one external program per stage invocation and blocks until it exits.
#[derive(Debug, Clone)]
pub struct CommandStage {
    stage: Stage,
    spec: CommandSpec,
}

impl CommandStage {
    pub fn new(stage: Stage, spec: CommandSpec) -> Self {
        Self { stage, spec }
    }

    fn fail(&self, message: String) -> PipelineError {
        PipelineError::stage(self.stage.as_str(), message)
    }

    fn execute(&self, template: &ArgTemplate) -> Result<()> {
        let unresolved: Vec<String> = self
            .spec
            .args
            .iter()
            .flat_map(|arg| template.unresolved(arg))
            .collect();
        if !unresolved.is_empty() {
            return Err(PipelineError::Config(format!(
                "stages.{}: unknown placeholder(s) {}",
                self.stage.as_str(),
                unresolved.join(", ")
            )));
        }

        let args = template.render_all(&self.spec.args);
        let mut command = Command::new(&self.spec.program);
        command
            .args(&args)
            .envs(&self.spec.env)
            .stdin(Stdio::null());
        if let Some(dir) = &self.spec.working_dir {
            command.current_dir(dir);
        }

        debug!(stage = self.stage.as_str(), program = %self.spec.program, ?args, "Launching stage command");

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.fail(format!("cannot launch '{}': {}", self.spec.program, e)))?;

        let stage = self.stage.as_str();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stderr_tail = thread::scope(|scope| {
            if let Some(stdout) = stdout {
                scope.spawn(move || forward_lines(stage, stdout, |_| {}));
            }
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            if let Some(stderr) = stderr {
                forward_lines(stage, stderr, |line| {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                });
            }
            tail
        });

        let status = child
            .wait()
            .map_err(|e| self.fail(format!("lost track of '{}': {}", self.spec.program, e)))?;

        if !status.success() {
            let stderr = Vec::from(stderr_tail).join("\n");
            return Err(self.fail(format!(
                "'{}' exited with {}: {}",
                self.spec.program,
                status,
                Validator::tail_text(&stderr, STDERR_TAIL_BYTES)
            )));
        }

        Ok(())
    }

    fn expect_report(&self, report: &Path) -> Result<()> {
        if !report.is_file() {
            return Err(self.fail(format!(
                "'{}' finished without writing {}",
                self.spec.program,
                report.display()
            )));
        }
        Ok(())
    }
}

/// Logs each line of a child's output stream as it arrives and hands it to `keep`.
fn forward_lines(stage: &str, stream: impl Read, mut keep: impl FnMut(String)) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                debug!(stage, "{}", line);
                keep(line);
            }
            Err(e) => {
                debug!(stage, error = %e, "Stopped reading stage output");
                break;
            }
        }
    }
}

impl ExtractionStage for CommandStage {
    fn process(
        &self,
        image_manifest: &Path,
        mask_manifest: &Path,
        text_dir: &Path,
        extraction_dir: &Path,
        subject_count: usize,
    ) -> Result<()> {
        let template = ArgTemplate::new()
            .with_path("image_manifest", image_manifest)
            .with_path("mask_manifest", mask_manifest)
            .with_path("text_dir", text_dir)
            .with_path("extraction_dir", extraction_dir)
            .with_value("subject_count", subject_count.to_string());
        self.execute(&template)
    }
}

impl VolumetricStage for CommandStage {
    fn compute_volumes(
        &self,
        image_manifest: &Path,
        mask_manifest: &Path,
        sid_file: &Path,
        text_dir: &Path,
    ) -> Result<()> {
        let report = text_dir.join(VOLUMETRIC_REPORT_NAME);
        let template = ArgTemplate::new()
            .with_path("image_manifest", image_manifest)
            .with_path("mask_manifest", mask_manifest)
            .with_path("sid_file", sid_file)
            .with_path("text_dir", text_dir)
            .with_path("report_path", &report);
        self.execute(&template)?;
        self.expect_report(&report)
    }
}

/// QC command plus the report file name it is expected to produce.
#[derive(Debug, Clone)]
pub struct CommandQualityCheck {
    inner: CommandStage,
    report_name: String,
}

impl CommandQualityCheck {
    pub fn new(spec: QualityCheckSpec) -> Self {
        Self {
            inner: CommandStage::new(Stage::QualityCheck, spec.command),
            report_name: spec.report_name,
        }
    }
}

impl QualityCheckStage for CommandQualityCheck {
    fn run_quality_check(&self, text_dir: &Path) -> Result<PathBuf> {
        let report = text_dir.join(&self.report_name);
        let template = ArgTemplate::new()
            .with_path("text_dir", text_dir)
            .with_path("report_path", &report);
        self.inner.execute(&template)?;
        self.inner.expect_report(&report)?;
        Ok(report)
    }
}

impl StageSet {
    pub fn from_config(stages: &StagesConfig) -> Self {
        StageSet::new(
            CommandStage::new(Stage::Extraction, stages.extraction.clone()),
            CommandQualityCheck::new(stages.quality_check.clone()),
            CommandStage::new(Stage::VolumetricAnalysis, stages.volumetric.clone()),
        )
    }
}
