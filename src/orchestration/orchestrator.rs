//! # Deployment Orchestrator
//!
//! Runs one deployment as a linear pipeline:
//!
//! ```text
//! validate artifact ─▶ endpoint name ─▶ resolve target ─▶ upload ─▶ strategy
//! ```
//!
//! Each step depends on the previous one succeeding. Errors are published as
//! lifecycle failures and returned to the caller unchanged. Completed steps
//! are recorded in a [`DeploymentJournal`]; when a [`CompensationHook`] is
//! installed it is run over them in reverse after a failure.

use super::compensation::CompensationHook;
use super::journal::{DeploymentJournal, DeploymentStep};
use super::request::DeploymentRequest;
use super::target::{
    DeploymentStrategy, DeploymentTarget, RayStrategy, TargetDeployment, VertexAiStrategy,
};
use crate::artifact::ModelArtifact;
use crate::config::{ConfigLoader, DeploymentConfig};
use crate::endpoint::EndpointDeployer;
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use crate::logging;
use crate::storage::StoragePublisher;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const COMPONENT: &str = "orchestrator";
const VALIDATOR: &str = "artifact_validator";

pub struct DeploymentOrchestrator {
    project_id: String,
    region: String,
    storage: Arc<StoragePublisher>,
    strategies: HashMap<DeploymentTarget, Arc<dyn DeploymentStrategy>>,
    compensation: Option<Arc<dyn CompensationHook>>,
    events: EventPublisher,
}

impl DeploymentOrchestrator {
    /// Orchestrator with the built-in strategy for every target
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        storage: Arc<StoragePublisher>,
        deployer: Arc<EndpointDeployer>,
        events: EventPublisher,
    ) -> Self {
        let orchestrator = Self {
            project_id: project_id.into(),
            region: region.into(),
            storage,
            strategies: HashMap::new(),
            compensation: None,
            events,
        };

        orchestrator
            .with_strategy(Arc::new(VertexAiStrategy::new(deployer)))
            .with_strategy(Arc::new(RayStrategy))
    }

    /// Register or replace the strategy for its target
    pub fn with_strategy(mut self, strategy: Arc<dyn DeploymentStrategy>) -> Self {
        self.strategies.insert(strategy.target(), strategy);
        self
    }

    pub fn with_compensation(mut self, hook: Arc<dyn CompensationHook>) -> Self {
        self.compensation = Some(hook);
        self
    }

    pub fn events(&self) -> &EventPublisher {
        &self.events
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Deploy and return the endpoint resource name
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<String> {
        let mut journal = DeploymentJournal::new();
        self.deploy_with_journal(request, &mut journal).await
    }

    /// Load a deployment document and deploy `model_path` with it
    pub async fn deploy_from_config(
        &self,
        config_path: impl AsRef<Path>,
        model_path: impl AsRef<Path>,
    ) -> Result<String> {
        let config = ConfigLoader::load(config_path)?;
        self.deploy_config(&config, model_path).await
    }

    pub async fn deploy_config(
        &self,
        config: &DeploymentConfig,
        model_path: impl AsRef<Path>,
    ) -> Result<String> {
        debug!(
            model_name = %config.model_name,
            project_id = %config.project_id,
            region = %config.region,
            "Deploying from configuration"
        );

        let request = DeploymentRequest::from_config(config, model_path);
        self.deploy(&request).await
    }

    #[instrument(
        skip(self, request, journal),
        fields(deployment_id = %journal.deployment_id(), target = %request.target)
    )]
    pub async fn deploy_with_journal(
        &self,
        request: &DeploymentRequest,
        journal: &mut DeploymentJournal,
    ) -> Result<String> {
        journal.begin();
        self.events.start(
            COMPONENT,
            format!(
                "Deploying {} to {} (bucket {})",
                request.model_path.display(),
                request.target,
                request.bucket_name
            ),
        );

        match self.run_pipeline(request, journal).await {
            Ok(resource_name) => {
                journal.complete();
                self.events
                    .success(COMPONENT, format!("Deployment complete: {resource_name}"));
                Ok(resource_name)
            }
            Err(e) => {
                journal.fail(&e);
                self.events
                    .failure(COMPONENT, format!("Deployment failed ({}): {e}", e.kind()));
                self.compensate(journal).await;
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        request: &DeploymentRequest,
        journal: &mut DeploymentJournal,
    ) -> Result<String> {
        let artifact = self.validate_artifact(&request.model_path)?;
        journal.record(
            DeploymentStep::ValidateArtifact,
            artifact.path().display().to_string(),
        );

        let endpoint_name = request
            .explicit_endpoint_name()
            .map(str::to_string)
            .unwrap_or_else(|| artifact.default_endpoint_name());

        let target: DeploymentTarget = request.target.parse()?;
        let strategy = self.strategy_for(target)?;

        let location = self
            .storage
            .publish(artifact.path(), &endpoint_name, &request.bucket_name)
            .await?;
        journal.record(DeploymentStep::UploadArtifact, location.uri());
        info!(location = %location, endpoint_name = %endpoint_name, "Artifact uploaded");

        let plan = TargetDeployment {
            artifact: &artifact,
            location: &location,
            endpoint_name: &endpoint_name,
            framework: &request.framework,
            version: &request.version,
            custom_requirements: request.requirements(),
        };

        strategy.deploy(&plan, journal).await
    }

    fn validate_artifact(&self, model_path: &Path) -> Result<ModelArtifact> {
        self.events
            .start(VALIDATOR, format!("Validating {}", model_path.display()));

        match ModelArtifact::validate(model_path) {
            Ok(artifact) => {
                self.events.success(
                    VALIDATOR,
                    format!("{} is a {} artifact", model_path.display(), artifact.format()),
                );
                Ok(artifact)
            }
            Err(e) => {
                self.events.failure(VALIDATOR, e.to_string());
                Err(e)
            }
        }
    }

    fn strategy_for(&self, target: DeploymentTarget) -> Result<Arc<dyn DeploymentStrategy>> {
        self.strategies.get(&target).cloned().ok_or_else(|| {
            DeployerError::unsupported_target(format!("no strategy registered for {target}"))
        })
    }

    async fn compensate(&self, journal: &mut DeploymentJournal) {
        let Some(hook) = &self.compensation else {
            return;
        };

        for step in journal.completed().iter().rev() {
            if let Err(e) = hook.compensate(step).await {
                logging::log_error(
                    COMPONENT,
                    "compensate",
                    &e.to_string(),
                    Some(&step.step.to_string()),
                );
            }
        }
        journal.mark_compensated();
    }
}
