//! Per-step outcomes of provision/decommission runs

use std::fmt;

use serde::Serialize;

use crate::ue::UeId;
use crate::Error;

/// One step of a provision or decommission run, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Persist the UE configuration locally
    WriteArtifact,
    /// Create the ConfigMap carrying the configuration
    CreateConfigMap,
    /// Create the UPF Deployment
    CreateUpfDeployment,
    /// Create the UPF Service
    CreateUpfService,
    /// Announce the DNN to UPF mapping to the SMF
    NotifySmf,
    /// Create the UE pod
    CreateUePod,
    /// Remove the local UE configuration
    DeleteArtifact,
    /// Delete the UE pod
    DeleteUePod,
    /// Delete the ConfigMap
    DeleteConfigMap,
    /// Delete the UPF Deployment
    DeleteUpfDeployment,
    /// Delete the UPF Service
    DeleteUpfService,
    /// Recompute the UE/UPF gauges
    RefreshMetrics,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::WriteArtifact => "write_artifact",
            Step::CreateConfigMap => "create_config_map",
            Step::CreateUpfDeployment => "create_upf_deployment",
            Step::CreateUpfService => "create_upf_service",
            Step::NotifySmf => "notify_smf",
            Step::CreateUePod => "create_ue_pod",
            Step::DeleteArtifact => "delete_artifact",
            Step::DeleteUePod => "delete_ue_pod",
            Step::DeleteConfigMap => "delete_config_map",
            Step::DeleteUpfDeployment => "delete_upf_deployment",
            Step::DeleteUpfService => "delete_upf_service",
            Step::RefreshMetrics => "refresh_metrics",
        };
        f.write_str(name)
    }
}

/// Result of a single step
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step did what it set out to do
    Ok,
    /// The object to remove was already absent
    NotFound,
    /// The step failed; later steps still ran
    Failed(String),
}

impl StepOutcome {
    /// Classify the result of a collaborator call
    pub fn from_result<T>(result: Result<T, Error>) -> Self {
        match result {
            Ok(_) => StepOutcome::Ok,
            Err(e) if e.is_not_found() => StepOutcome::NotFound,
            Err(e) => StepOutcome::Failed(e.to_string()),
        }
    }

    /// Whether the step counts as successful
    pub fn is_success(&self) -> bool {
        !matches!(self, StepOutcome::Failed(_))
    }
}

/// A step paired with its outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepResult {
    /// Which step ran
    pub step: Step,
    /// How it went
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Which operation a report describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Provision a UE
    Provision,
    /// Decommission a UE
    Decommission,
}

/// Ordered outcomes of every step of one provision/decommission run
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// UE the run was for
    pub ue_id: UeId,
    /// Provision or decommission
    pub operation: Operation,
    /// Outcomes in execution order
    pub steps: Vec<StepResult>,
}

impl StepReport {
    /// Start an empty report
    pub fn new(ue_id: UeId, operation: Operation) -> Self {
        Self {
            ue_id,
            operation,
            steps: Vec::new(),
        }
    }

    /// Append a step outcome
    pub fn record(&mut self, step: Step, outcome: StepOutcome) {
        self.steps.push(StepResult { step, outcome });
    }

    /// Outcome of `step`, if it ran
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|r| r.step == step)
            .map(|r| &r.outcome)
    }

    /// Steps in the order they ran
    pub fn executed_steps(&self) -> Vec<Step> {
        self.steps.iter().map(|r| r.step).collect()
    }

    /// Whether every step succeeded (absent-on-delete counts as success)
    pub fn is_success(&self) -> bool {
        self.steps.iter().all(|r| r.outcome.is_success())
    }

    /// Steps that failed
    pub fn failures(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|r| !r.outcome.is_success())
    }
}

/// Reports of a bulk run, one per UE in id order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    /// Per-UE reports
    pub reports: Vec<StepReport>,
}

impl BulkReport {
    /// Number of UEs whose run had no failed step
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    /// Number of UEs with at least one failed step
    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }
}
