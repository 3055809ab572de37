use crate::error::{DeployerError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Process-level settings for the remote service clients and the build step.
///
/// Everything here has a working default; `from_env` lets operators point the
/// deployer at other registries or API hosts without touching the deployment
/// document.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    /// Registry hosting the prebuilt framework serving images
    pub default_image_registry: String,
    /// Registry host custom images are pushed to (`<host>/<project>/...`)
    pub image_registry: String,
    /// Parent directory for scoped build contexts
    pub build_root: PathBuf,
    pub docker_binary: String,
    pub storage_api_base: String,
    pub platform_api_host: Option<String>,
    pub monitoring_api_base: String,
    pub request_timeout: Duration,
    pub operation_poll_interval: Duration,
    pub operation_timeout: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_image_registry: "us-docker.pkg.dev/vertex-ai/prediction".to_string(),
            image_registry: "gcr.io".to_string(),
            build_root: std::env::temp_dir(),
            docker_binary: "docker".to_string(),
            storage_api_base: "https://storage.googleapis.com".to_string(),
            platform_api_host: None,
            monitoring_api_base: "https://monitoring.googleapis.com".to_string(),
            request_timeout: Duration::from_secs(60),
            operation_poll_interval: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(3600),
        }
    }
}

impl RuntimeSettings {
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(registry) = std::env::var("MODEL_DEPLOYER_DEFAULT_IMAGE_REGISTRY") {
            settings.default_image_registry = registry;
        }

        if let Ok(registry) = std::env::var("MODEL_DEPLOYER_IMAGE_REGISTRY") {
            settings.image_registry = registry;
        }

        if let Ok(root) = std::env::var("MODEL_DEPLOYER_BUILD_ROOT") {
            settings.build_root = PathBuf::from(root);
        }

        if let Ok(binary) = std::env::var("MODEL_DEPLOYER_DOCKER_BINARY") {
            settings.docker_binary = binary;
        }

        if let Ok(base) = std::env::var("MODEL_DEPLOYER_STORAGE_API") {
            settings.storage_api_base = base;
        }

        if let Ok(host) = std::env::var("MODEL_DEPLOYER_PLATFORM_API") {
            settings.platform_api_host = Some(host);
        }

        if let Ok(base) = std::env::var("MODEL_DEPLOYER_MONITORING_API") {
            settings.monitoring_api_base = base;
        }

        if let Ok(secs) = std::env::var("MODEL_DEPLOYER_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = Duration::from_secs(secs.parse().map_err(|e| {
                DeployerError::configuration(format!("Invalid request timeout: {e}"))
            })?);
        }

        if let Ok(secs) = std::env::var("MODEL_DEPLOYER_POLL_INTERVAL_SECS") {
            settings.operation_poll_interval = Duration::from_secs(secs.parse().map_err(|e| {
                DeployerError::configuration(format!("Invalid poll interval: {e}"))
            })?);
        }

        if let Ok(secs) = std::env::var("MODEL_DEPLOYER_OPERATION_TIMEOUT_SECS") {
            settings.operation_timeout = Duration::from_secs(secs.parse().map_err(|e| {
                DeployerError::configuration(format!("Invalid operation timeout: {e}"))
            })?);
        }

        Ok(settings)
    }

    /// Regional API host of the serving platform
    pub fn platform_api_base(&self, region: &str) -> String {
        match &self.platform_api_host {
            Some(host) => host.clone(),
            None => format!("https://{region}-aiplatform.googleapis.com"),
        }
    }
}
