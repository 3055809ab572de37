use crate::clients::{
    CloudMonitoringClient, ContainerEngine, DockerCli, GcsClient, InMemoryServices, MetricService,
    ObjectStore, PredictionPlatform, TokenSource, VertexAiClient,
};
use crate::config::RuntimeSettings;
use crate::containerizer::Containerizer;
use crate::endpoint::EndpointDeployer;
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use crate::monitoring::MonitoringRegistrar;
use crate::orchestration::{CleanupCompensation, DeploymentOrchestrator};
use crate::storage::StoragePublisher;
use std::sync::Arc;
use tracing::info;

/// Client handles and settings for one project/region pair.
///
/// Components are assembled from here so each receives its client at
/// construction time; nothing reaches for a process-wide client.
#[derive(Clone)]
pub struct DeploymentServices {
    pub project_id: String,
    pub region: String,
    pub engine: Arc<dyn ContainerEngine>,
    pub store: Arc<dyn ObjectStore>,
    pub platform: Arc<dyn PredictionPlatform>,
    pub metrics: Arc<dyn MetricService>,
    pub settings: RuntimeSettings,
    pub events: EventPublisher,
}

impl std::fmt::Debug for DeploymentServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentServices")
            .field("project_id", &self.project_id)
            .field("region", &self.region)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl DeploymentServices {
    /// Docker CLI plus the cloud REST clients
    pub fn production(
        project_id: impl Into<String>,
        region: impl Into<String>,
        settings: RuntimeSettings,
    ) -> Result<Self> {
        let project_id = project_id.into();
        let region = region.into();
        let token = TokenSource::from_env();
        let client_error =
            |e: crate::clients::ClientError| DeployerError::configuration(e.to_string());

        let store = GcsClient::new(
            &settings.storage_api_base,
            project_id.as_str(),
            token.clone(),
            settings.request_timeout,
        )
        .map_err(client_error)?;

        let platform = VertexAiClient::new(
            settings.platform_api_base(&region),
            project_id.as_str(),
            region.as_str(),
            token.clone(),
            settings.request_timeout,
        )
        .map_err(client_error)?
        .with_polling(settings.operation_poll_interval, settings.operation_timeout);

        let metrics = CloudMonitoringClient::new(
            settings.monitoring_api_base.as_str(),
            token,
            settings.request_timeout,
        )
        .map_err(client_error)?;

        info!(
            project_id = %project_id,
            region = %region,
            "Initialized cloud service clients"
        );

        Ok(Self {
            engine: Arc::new(DockerCli::new(settings.docker_binary.as_str())),
            store: Arc::new(store),
            platform: Arc::new(platform),
            metrics: Arc::new(metrics),
            project_id,
            region,
            settings,
            events: EventPublisher::default(),
        })
    }

    /// In-process services; the returned handles expose what was recorded
    pub fn in_memory(
        project_id: impl Into<String>,
        region: impl Into<String>,
        settings: RuntimeSettings,
    ) -> (Self, InMemoryServices) {
        let project_id = project_id.into();
        let region = region.into();
        let fakes = InMemoryServices::new(&project_id, &region);

        let services = Self {
            project_id,
            region,
            engine: fakes.engine.clone(),
            store: fakes.store.clone(),
            platform: fakes.platform.clone(),
            metrics: fakes.metrics.clone(),
            settings,
            events: EventPublisher::default(),
        };

        (services, fakes)
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = events;
        self
    }

    pub fn storage_publisher(&self) -> Arc<StoragePublisher> {
        Arc::new(StoragePublisher::new(self.store.clone(), self.events.clone()))
    }

    pub fn containerizer(&self) -> Containerizer {
        Containerizer::new(self.project_id.as_str(), self.engine.clone(), self.events.clone())
            .with_registries(
                self.settings.image_registry.as_str(),
                self.settings.default_image_registry.as_str(),
            )
            .with_build_root(self.settings.build_root.clone())
    }

    pub fn endpoint_deployer(&self) -> Arc<EndpointDeployer> {
        Arc::new(EndpointDeployer::new(
            self.platform.clone(),
            self.containerizer(),
            self.events.clone(),
        ))
    }

    /// Orchestrator that leaves completed steps in place on failure
    pub fn orchestrator(&self) -> DeploymentOrchestrator {
        DeploymentOrchestrator::new(
            self.project_id.as_str(),
            self.region.as_str(),
            self.storage_publisher(),
            self.endpoint_deployer(),
            self.events.clone(),
        )
    }

    /// Orchestrator that deletes the uploaded artifact and registered model on failure
    pub fn orchestrator_with_rollback(&self) -> DeploymentOrchestrator {
        let storage = self.storage_publisher();
        let deployer = self.endpoint_deployer();
        let cleanup = CleanupCompensation::new(storage.clone(), deployer.clone());

        DeploymentOrchestrator::new(
            self.project_id.as_str(),
            self.region.as_str(),
            storage,
            deployer,
            self.events.clone(),
        )
        .with_compensation(Arc::new(cleanup))
    }

    pub fn monitoring(&self) -> MonitoringRegistrar {
        MonitoringRegistrar::new(self.metrics.clone(), self.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containerizer_uses_configured_registries() {
        let settings = RuntimeSettings {
            image_registry: "registry.example.com".to_string(),
            default_image_registry: "mirror.example.com/prediction".to_string(),
            ..RuntimeSettings::default()
        };
        let (services, _fakes) = DeploymentServices::in_memory("p1", "us-central1", settings);

        let containerizer = services.containerizer();
        assert_eq!(
            containerizer.image_tag("1.0"),
            "registry.example.com/p1/vertex-ai-model:1.0"
        );
        assert_eq!(containerizer.base_image_registry(), "mirror.example.com/prediction");
    }

    #[test]
    fn test_production_clients_construct_without_network() {
        let services =
            DeploymentServices::production("p1", "us-central1", RuntimeSettings::default())
                .unwrap();
        assert_eq!(services.project_id, "p1");
        assert_eq!(services.region, "us-central1");
    }

    #[test]
    fn test_production_rejects_invalid_storage_url() {
        let settings = RuntimeSettings {
            storage_api_base: "not a url".to_string(),
            ..RuntimeSettings::default()
        };
        let err = DeploymentServices::production("p1", "us-central1", settings).unwrap_err();
        assert!(matches!(err, DeployerError::Configuration(_)));
    }
}
