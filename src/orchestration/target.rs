//! Deployment targets.
//!
//! Each target is a variant of [`DeploymentTarget`] with one
//! [`DeploymentStrategy`] implementation behind it.

use super::journal::DeploymentJournal;
use crate::artifact::ModelArtifact;
use crate::endpoint::{EndpointDeployer, EndpointRequest};
use crate::error::{DeployerError, Result};
use crate::storage::StorageLocation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentTarget {
    VertexAi,
    Ray,
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VertexAi => write!(f, "vertex_ai"),
            Self::Ray => write!(f, "ray"),
        }
    }
}

impl std::str::FromStr for DeploymentTarget {
    type Err = DeployerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "vertex_ai" => Ok(Self::VertexAi),
            "ray" => Ok(Self::Ray),
            _ => Err(DeployerError::configuration(format!(
                "Invalid deployment target: {s} (expected vertex_ai or ray)"
            ))),
        }
    }
}

/// Everything a target needs once the artifact is uploaded
#[derive(Debug, Clone, Copy)]
pub struct TargetDeployment<'a> {
    pub artifact: &'a ModelArtifact,
    pub location: &'a StorageLocation,
    pub endpoint_name: &'a str,
    pub framework: &'a str,
    pub version: &'a str,
    pub custom_requirements: Option<&'a BTreeMap<String, String>>,
}

#[async_trait]
pub trait DeploymentStrategy: Send + Sync {
    fn target(&self) -> DeploymentTarget;

    /// Deploy the uploaded artifact and return the endpoint resource name
    async fn deploy(
        &self,
        plan: &TargetDeployment<'_>,
        journal: &mut DeploymentJournal,
    ) -> Result<String>;
}

pub struct VertexAiStrategy {
    deployer: Arc<EndpointDeployer>,
}

impl VertexAiStrategy {
    pub fn new(deployer: Arc<EndpointDeployer>) -> Self {
        Self { deployer }
    }
}

#[async_trait]
impl DeploymentStrategy for VertexAiStrategy {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::VertexAi
    }

    async fn deploy(
        &self,
        plan: &TargetDeployment<'_>,
        journal: &mut DeploymentJournal,
    ) -> Result<String> {
        let request = EndpointRequest {
            location: plan.location,
            endpoint_name: plan.endpoint_name,
            framework: plan.framework,
            version: plan.version,
            custom_requirements: plan.custom_requirements,
            artifact: plan.artifact,
        };

        let endpoint = self.deployer.deploy(&request, journal).await?;
        Ok(endpoint.resource_name)
    }
}

/// Ray Serve is not supported; every deployment attempt fails permanently
pub struct RayStrategy;

#[async_trait]
impl DeploymentStrategy for RayStrategy {
    fn target(&self) -> DeploymentTarget {
        DeploymentTarget::Ray
    }

    async fn deploy(
        &self,
        _plan: &TargetDeployment<'_>,
        _journal: &mut DeploymentJournal,
    ) -> Result<String> {
        Err(DeployerError::unsupported_target(
            "ray deployment is not implemented",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("vertex_ai".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::VertexAi);
        assert_eq!("ray".parse::<DeploymentTarget>().unwrap(), DeploymentTarget::Ray);

        let err = "sagemaker".parse::<DeploymentTarget>().unwrap_err();
        assert!(matches!(err, DeployerError::Configuration(_)));
        assert!(err.to_string().contains("sagemaker"));
    }

    #[test]
    fn test_target_display_matches_config_spelling() {
        assert_eq!(DeploymentTarget::VertexAi.to_string(), "vertex_ai");
        assert_eq!(DeploymentTarget::Ray.to_string(), "ray");
    }
}
