//! Compensating actions for failed deployments.
//!
//! Without a hook, completed steps of a failed deployment stay in place. A
//! [`CompensationHook`] is invoked once per completed step, most recent first.

use super::journal::{CompletedStep, DeploymentStep};
use crate::endpoint::EndpointDeployer;
use crate::error::Result;
use crate::storage::{StorageLocation, StoragePublisher};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait CompensationHook: Send + Sync {
    async fn compensate(&self, step: &CompletedStep) -> Result<()>;
}

/// Deletes the uploaded artifact and the registered model resource.
///
/// Built images and validation have nothing to undo and are skipped.
pub struct CleanupCompensation {
    storage: Arc<StoragePublisher>,
    deployer: Arc<EndpointDeployer>,
}

impl CleanupCompensation {
    pub fn new(storage: Arc<StoragePublisher>, deployer: Arc<EndpointDeployer>) -> Self {
        Self { storage, deployer }
    }
}

#[async_trait]
impl CompensationHook for CleanupCompensation {
    async fn compensate(&self, step: &CompletedStep) -> Result<()> {
        match step.step {
            DeploymentStep::UploadArtifact => {
                let location = parse_location(&step.output)?;
                info!(location = %location, "Removing uploaded artifact");
                self.storage.remove(&location).await
            }
            DeploymentStep::RegisterModel => {
                info!(model = %step.output, "Deleting registered model");
                self.deployer.delete_model(&step.output).await
            }
            DeploymentStep::ValidateArtifact
            | DeploymentStep::BuildImage
            | DeploymentStep::DeployEndpoint => Ok(()),
        }
    }
}

/// Split a recorded `gs://bucket/models/<name>/<file>` back into a location
fn parse_location(uri: &str) -> Result<StorageLocation> {
    let invalid =
        || crate::error::DeployerError::storage_publish(format!("Unrecognised storage URI: {uri}"));

    let rest = uri.strip_prefix("gs://").ok_or_else(invalid)?;
    let (bucket, object_path) = rest.split_once('/').ok_or_else(invalid)?;
    let logical_and_file = object_path.strip_prefix("models/").ok_or_else(invalid)?;
    let (logical_name, file_name) = logical_and_file.rsplit_once('/').ok_or_else(invalid)?;

    Ok(StorageLocation::new(bucket, logical_name, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location_round_trip() {
        let location = StorageLocation::new("b1", "churn", "model.pkl");
        assert_eq!(parse_location(&location.uri()).unwrap(), location);
    }

    #[test]
    fn test_parse_location_rejects_foreign_uris() {
        assert!(parse_location("s3://b1/models/churn/model.pkl").is_err());
        assert!(parse_location("gs://b1/other/model.pkl").is_err());
    }
}
