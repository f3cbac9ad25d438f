// file: src/pipeline/state.rs
// description: run state machine, stage identifiers and the transition table
// reference: linear pipeline with a conditional final stage

use crate::error::{PipelineError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    WorkspaceReady,
    SidsResolved,
    Extracted,
    QcDone,
    VolumeDone,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }

    /// State reached by running `stage` from here. Errors if `stage` does not
    /// start at this state.
    pub fn apply(self, stage: Stage) -> Result<PipelineState> {
        let transition = stage.transition();
        if transition.from != self {
            return Err(PipelineError::Validation(format!(
                "stage '{}' cannot run from state {:?}",
                stage, self
            )));
        }
        Ok(transition.to)
    }

    /// State a run lands in when the stage started from here errors.
    /// Terminal states are left as they are.
    pub fn fail(self) -> PipelineState {
        if self.is_terminal() {
            self
        } else {
            PipelineState::Failed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Workspace,
    Identifiers,
    Extraction,
    QualityCheck,
    VolumetricAnalysis,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Workspace => "workspace",
            Stage::Identifiers => "identifiers",
            Stage::Extraction => "extraction",
            Stage::QualityCheck => "quality_check",
            Stage::VolumetricAnalysis => "volumetric_analysis",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Workspace => "Preparing output workspace",
            Stage::Identifiers => "Resolving subject identifiers",
            Stage::Extraction => "Extracting segmented regions",
            Stage::QualityCheck => "Running segmentation quality check",
            Stage::VolumetricAnalysis => "Running volumetric analysis",
        }
    }

    /// Stages that only run when the configuration asks for them.
    pub fn is_optional(self) -> bool {
        matches!(self, Stage::VolumetricAnalysis)
    }

    fn transition(self) -> &'static Transition {
        let index = match self {
            Stage::Workspace => 0,
            Stage::Identifiers => 1,
            Stage::Extraction => 2,
            Stage::QualityCheck => 3,
            Stage::VolumetricAnalysis => 4,
        };
        &TRANSITIONS[index]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Transition {
    from: PipelineState,
    stage: Stage,
    to: PipelineState,
}

static TRANSITIONS: [Transition; 5] = [
    Transition {
        from: PipelineState::Init,
        stage: Stage::Workspace,
        to: PipelineState::WorkspaceReady,
    },
    Transition {
        from: PipelineState::WorkspaceReady,
        stage: Stage::Identifiers,
        to: PipelineState::SidsResolved,
    },
    Transition {
        from: PipelineState::SidsResolved,
        stage: Stage::Extraction,
        to: PipelineState::Extracted,
    },
    Transition {
        from: PipelineState::Extracted,
        stage: Stage::QualityCheck,
        to: PipelineState::QcDone,
    },
    Transition {
        from: PipelineState::QcDone,
        stage: Stage::VolumetricAnalysis,
        to: PipelineState::VolumeDone,
    },
];

/// What the orchestrator does next from a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Run(Stage),
    Skip(Stage),
    Finish,
}

/// The transition table specialised for one run's flags.
#[derive(Debug, Clone, Copy)]
pub struct StagePlan {
    volumetric_analysis: bool,
}

impl StagePlan {
    pub fn new(volumetric_analysis: bool) -> Self {
        Self {
            volumetric_analysis,
        }
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        !stage.is_optional() || self.volumetric_analysis
    }

    pub fn next(&self, state: PipelineState) -> Step {
        if state.is_terminal() {
            return Step::Finish;
        }

        match TRANSITIONS.iter().find(|t| t.from == state) {
            Some(t) if self.is_enabled(t.stage) => Step::Run(t.stage),
            Some(t) => Step::Skip(t.stage),
            None => Step::Finish,
        }
    }

    /// Stages this plan will actually run, in order.
    pub fn scheduled(&self) -> Vec<Stage> {
        TRANSITIONS
            .iter()
            .map(|t| t.stage)
            .filter(|stage| self.is_enabled(*stage))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(plan: StagePlan) -> Vec<Step> {
        let mut state = PipelineState::Init;
        let mut steps = Vec::new();
        loop {
            let step = plan.next(state);
            steps.push(step);
            match step {
                Step::Run(stage) => state = state.apply(stage).unwrap(),
                Step::Skip(_) => state = PipelineState::Complete,
                Step::Finish => break,
            }
        }
        steps
    }

    #[test]
    fn test_plan_without_volumetric_skips_last_stage() {
        assert_eq!(
            walk(StagePlan::new(false)),
            vec![
                Step::Run(Stage::Workspace),
                Step::Run(Stage::Identifiers),
                Step::Run(Stage::Extraction),
                Step::Run(Stage::QualityCheck),
                Step::Skip(Stage::VolumetricAnalysis),
                Step::Finish,
            ]
        );
    }

    #[test]
    fn test_plan_with_volumetric_runs_every_stage() {
        assert_eq!(
            walk(StagePlan::new(true)),
            vec![
                Step::Run(Stage::Workspace),
                Step::Run(Stage::Identifiers),
                Step::Run(Stage::Extraction),
                Step::Run(Stage::QualityCheck),
                Step::Run(Stage::VolumetricAnalysis),
                Step::Finish,
            ]
        );
    }

    #[test]
    fn test_scheduled_stages() {
        assert_eq!(StagePlan::new(false).scheduled().len(), 4);
        assert_eq!(
            StagePlan::new(true).scheduled().last(),
            Some(&Stage::VolumetricAnalysis)
        );
    }

    #[test]
    fn test_out_of_order_stage_rejected() {
        assert!(PipelineState::Init.apply(Stage::Extraction).is_err());
        assert!(PipelineState::Failed.apply(Stage::Workspace).is_err());
        assert_eq!(
            PipelineState::Extracted.apply(Stage::QualityCheck).unwrap(),
            PipelineState::QcDone
        );
    }

    #[test]
    fn test_fail_moves_running_states_to_failed() {
        assert_eq!(PipelineState::SidsResolved.fail(), PipelineState::Failed);
        assert_eq!(PipelineState::Init.fail(), PipelineState::Failed);
        assert_eq!(PipelineState::Complete.fail(), PipelineState::Complete);
        assert_eq!(
            StagePlan::new(true).next(PipelineState::QcDone.fail()),
            Step::Finish
        );
    }

    #[test]
    fn test_terminal_states_finish() {
        let plan = StagePlan::new(true);
        assert_eq!(plan.next(PipelineState::Complete), Step::Finish);
        assert_eq!(plan.next(PipelineState::Failed), Step::Finish);
        assert_eq!(plan.next(PipelineState::VolumeDone), Step::Finish);
    }
}
