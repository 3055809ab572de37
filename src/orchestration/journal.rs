//! Deployment journal.
//!
//! Records which pipeline steps completed, and with what output, so that a
//! failed deployment can be inspected and optionally compensated.

use crate::error::DeployerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall state of one deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    /// Created, nothing executed yet
    Pending,
    /// Pipeline is running
    InProgress,
    /// Endpoint is serving
    Complete,
    /// A step failed; completed steps were left in place
    Error,
    /// A step failed and compensation ran for the completed steps
    Compensated,
}

impl DeploymentState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Compensated)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Compensated)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
            Self::Compensated => write!(f, "compensated"),
        }
    }
}

impl std::str::FromStr for DeploymentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            "compensated" => Ok(Self::Compensated),
            _ => Err(format!("Invalid deployment state: {s}")),
        }
    }
}

/// Pipeline steps that leave something behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStep {
    ValidateArtifact,
    UploadArtifact,
    BuildImage,
    RegisterModel,
    DeployEndpoint,
}

impl fmt::Display for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidateArtifact => write!(f, "validate_artifact"),
            Self::UploadArtifact => write!(f, "upload_artifact"),
            Self::BuildImage => write!(f, "build_image"),
            Self::RegisterModel => write!(f, "register_model"),
            Self::DeployEndpoint => write!(f, "deploy_endpoint"),
        }
    }
}

/// A step that finished, with the identifier of what it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedStep {
    pub step: DeploymentStep,
    /// Artifact path, storage URI, image reference or resource name
    pub output: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentJournal {
    deployment_id: Uuid,
    state: DeploymentState,
    completed: Vec<CompletedStep>,
    failure: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl DeploymentJournal {
    pub fn new() -> Self {
        Self {
            deployment_id: Uuid::new_v4(),
            state: DeploymentState::Pending,
            completed: Vec::new(),
            failure: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn deployment_id(&self) -> Uuid {
        self.deployment_id
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    pub fn completed(&self) -> &[CompletedStep] {
        &self.completed
    }

    pub fn completed_steps(&self) -> Vec<DeploymentStep> {
        self.completed.iter().map(|c| c.step).collect()
    }

    /// Output of the most recent completion of `step`
    pub fn output_of(&self, step: DeploymentStep) -> Option<&str> {
        self.completed
            .iter()
            .rev()
            .find(|c| c.step == step)
            .map(|c| c.output.as_str())
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn record(&mut self, step: DeploymentStep, output: impl Into<String>) {
        self.completed.push(CompletedStep {
            step,
            output: output.into(),
            completed_at: Utc::now(),
        });
    }

    pub(crate) fn begin(&mut self) {
        self.state = DeploymentState::InProgress;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn complete(&mut self) {
        self.state = DeploymentState::Complete;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: &DeployerError) {
        self.state = DeploymentState::Error;
        self.failure = Some(error.to_string());
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn mark_compensated(&mut self) {
        self.state = DeploymentState::Compensated;
    }
}

impl Default for DeploymentJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trips_through_display() {
        for state in [
            DeploymentState::Pending,
            DeploymentState::InProgress,
            DeploymentState::Complete,
            DeploymentState::Error,
            DeploymentState::Compensated,
        ] {
            assert_eq!(state.to_string().parse::<DeploymentState>().unwrap(), state);
        }
        assert!("rolled_back".parse::<DeploymentState>().is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut journal = DeploymentJournal::new();
        assert_eq!(journal.state(), DeploymentState::Pending);

        journal.begin();
        journal.record(DeploymentStep::UploadArtifact, "gs://b1/models/churn/model.pkl");
        assert_eq!(
            journal.output_of(DeploymentStep::UploadArtifact),
            Some("gs://b1/models/churn/model.pkl")
        );

        journal.fail(&DeployerError::endpoint_deployment("quota"));
        assert!(journal.state().is_terminal());
        assert!(journal.state().is_failure());
        assert_eq!(journal.failure(), Some("Endpoint deployment failed: quota"));
    }
}
