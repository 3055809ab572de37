//! # Endpoint Deployer
//!
//! Registers the uploaded artifact as a model resource on the serving platform
//! and deploys it behind a prediction endpoint with fixed scaling bounds.
//! A model that registers but then fails to deploy is left registered.

use crate::artifact::ModelArtifact;
use crate::clients::{EndpointDeployment, ModelUpload, PredictionPlatform};
use crate::containerizer::{ContainerImage, Containerizer};
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use crate::orchestration::journal::{DeploymentJournal, DeploymentStep};
use crate::storage::StorageLocation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub const MACHINE_TYPE: &str = "n1-standard-2";
pub const MIN_REPLICA_COUNT: u32 = 1;
pub const MAX_REPLICA_COUNT: u32 = 2;

const COMPONENT: &str = "endpoint_deployer";

/// Inputs for one endpoint deployment
#[derive(Debug, Clone, Copy)]
pub struct EndpointRequest<'a> {
    pub location: &'a StorageLocation,
    pub endpoint_name: &'a str,
    pub framework: &'a str,
    pub version: &'a str,
    pub custom_requirements: Option<&'a BTreeMap<String, String>>,
    /// Local artifact, copied into the image when a custom build is needed
    pub artifact: &'a ModelArtifact,
}

impl EndpointRequest<'_> {
    fn requirements(&self) -> Option<&BTreeMap<String, String>> {
        self.custom_requirements.filter(|reqs| !reqs.is_empty())
    }
}

/// A model serving behind a prediction endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedEndpoint {
    pub resource_name: String,
    pub model_resource_name: String,
    pub serving_image: ContainerImage,
    pub machine_type: String,
    pub min_replica_count: u32,
    pub max_replica_count: u32,
}

pub struct EndpointDeployer {
    platform: Arc<dyn PredictionPlatform>,
    containerizer: Containerizer,
    events: EventPublisher,
}

impl EndpointDeployer {
    pub fn new(
        platform: Arc<dyn PredictionPlatform>,
        containerizer: Containerizer,
        events: EventPublisher,
    ) -> Self {
        Self {
            platform,
            containerizer,
            events,
        }
    }

    pub async fn deploy(
        &self,
        request: &EndpointRequest<'_>,
        journal: &mut DeploymentJournal,
    ) -> Result<DeployedEndpoint> {
        self.events.start(
            COMPONENT,
            format!("Deploying {} from {}", request.endpoint_name, request.location),
        );

        match self.run(request, journal).await {
            Ok(endpoint) => {
                self.events.success(
                    COMPONENT,
                    format!("Endpoint ready: {}", endpoint.resource_name),
                );
                Ok(endpoint)
            }
            Err(e) => {
                self.events.failure(COMPONENT, e.to_string());
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        request: &EndpointRequest<'_>,
        journal: &mut DeploymentJournal,
    ) -> Result<DeployedEndpoint> {
        let image = self.select_serving_image(request).await?;
        if image.is_custom {
            journal.record(DeploymentStep::BuildImage, &image.registry_uri);
        }

        let model_resource_name = self
            .register_model(request.location, request.endpoint_name, &image)
            .await?;
        journal.record(DeploymentStep::RegisterModel, &model_resource_name);

        let resource_name = self
            .deploy_registered_model(&model_resource_name, request.endpoint_name)
            .await?;
        journal.record(DeploymentStep::DeployEndpoint, &resource_name);

        Ok(DeployedEndpoint {
            resource_name,
            model_resource_name,
            serving_image: image,
            machine_type: MACHINE_TYPE.to_string(),
            min_replica_count: MIN_REPLICA_COUNT,
            max_replica_count: MAX_REPLICA_COUNT,
        })
    }

    /// Custom image when extra packages are requested, prebuilt framework image otherwise
    pub async fn select_serving_image(
        &self,
        request: &EndpointRequest<'_>,
    ) -> Result<ContainerImage> {
        match request.requirements() {
            Some(requirements) => {
                self.containerizer
                    .build_serving_container(
                        request.artifact.path(),
                        request.framework,
                        request.version,
                        requirements,
                    )
                    .await
            }
            None => Ok(ContainerImage::prebuilt(
                self.containerizer.base_image_registry(),
                request.framework,
                request.version,
            )),
        }
    }

    async fn register_model(
        &self,
        location: &StorageLocation,
        display_name: &str,
        image: &ContainerImage,
    ) -> Result<String> {
        let upload = ModelUpload {
            display_name: display_name.to_string(),
            artifact_uri: location.directory_uri(),
            serving_image_uri: image.registry_uri.clone(),
        };

        let model = self.platform.upload_model(&upload).await.map_err(|e| {
            DeployerError::endpoint_deployment(format!(
                "Model registration for {display_name} failed: {e}"
            ))
        })?;
        info!(model = %model, image = %image, "Model registered");
        Ok(model)
    }

    async fn deploy_registered_model(
        &self,
        model_resource_name: &str,
        display_name: &str,
    ) -> Result<String> {
        let deployment = EndpointDeployment {
            model_resource_name: model_resource_name.to_string(),
            display_name: display_name.to_string(),
            machine_type: MACHINE_TYPE.to_string(),
            min_replica_count: MIN_REPLICA_COUNT,
            max_replica_count: MAX_REPLICA_COUNT,
        };

        self.platform.deploy_model(&deployment).await.map_err(|e| {
            DeployerError::endpoint_deployment(format!(
                "Deploying {model_resource_name} to an endpoint failed: {e}"
            ))
        })
    }

    /// Delete a registered model resource
    pub async fn delete_model(&self, model_resource_name: &str) -> Result<()> {
        self.platform
            .delete_model(model_resource_name)
            .await
            .map_err(|e| {
                DeployerError::endpoint_deployment(format!(
                    "Failed to delete {model_resource_name}: {e}"
                ))
            })
    }
}
