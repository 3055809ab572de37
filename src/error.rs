//! # Deployment Error Types
//!
//! One variant per pipeline phase. Components raise the variant of their own
//! phase and the orchestrator hands it back to the caller untouched.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    #[error("Container build failed: {0}")]
    ContainerBuild(String),

    #[error("Storage publish failed: {0}")]
    StoragePublish(String),

    #[error("Endpoint deployment failed: {0}")]
    EndpointDeployment(String),

    #[error("Unsupported deployment target: {0}")]
    UnsupportedTarget(String),

    #[error("Monitoring registration failed: {0}")]
    Monitoring(String),
}

impl DeployerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Missing required configuration key
    pub fn missing_field(field: &str) -> Self {
        Self::Configuration(format!("Missing required field in config: {field}"))
    }

    pub fn invalid_artifact(message: impl Into<String>) -> Self {
        Self::InvalidArtifact(message.into())
    }

    pub fn container_build(message: impl Into<String>) -> Self {
        Self::ContainerBuild(message.into())
    }

    pub fn storage_publish(message: impl Into<String>) -> Self {
        Self::StoragePublish(message.into())
    }

    pub fn endpoint_deployment(message: impl Into<String>) -> Self {
        Self::EndpointDeployment(message.into())
    }

    pub fn unsupported_target(target: impl Into<String>) -> Self {
        Self::UnsupportedTarget(target.into())
    }

    pub fn monitoring(message: impl Into<String>) -> Self {
        Self::Monitoring(message.into())
    }

    /// Short error kind used in lifecycle events and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::InvalidArtifact(_) => "invalid_artifact",
            Self::ContainerBuild(_) => "container_build",
            Self::StoragePublish(_) => "storage_publish",
            Self::EndpointDeployment(_) => "endpoint_deployment",
            Self::UnsupportedTarget(_) => "unsupported_target",
            Self::Monitoring(_) => "monitoring",
        }
    }

    /// Whether re-running the same deployment could ever succeed
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::InvalidArtifact(_) | Self::UnsupportedTarget(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_names_the_key() {
        let err = DeployerError::missing_field("bucket_name");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field in config: bucket_name"
        );
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_permanent_classification() {
        assert!(DeployerError::unsupported_target("ray").is_permanent());
        assert!(DeployerError::invalid_artifact("model.txt").is_permanent());
        assert!(!DeployerError::storage_publish("403 Forbidden").is_permanent());
        assert!(!DeployerError::endpoint_deployment("quota").is_permanent());
    }
}
