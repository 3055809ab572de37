//! # Remote Service Clients
//!
//! Every remote system the deployer talks to sits behind a trait so that
//! components receive their client handles at construction time:
//!
//! - [`ContainerEngine`] builds and pushes serving images
//! - [`ObjectStore`] holds uploaded artifacts
//! - [`PredictionPlatform`] registers models and deploys endpoints
//! - [`MetricService`] stores custom metric descriptors
//!
//! Production implementations talk to the docker CLI and to the cloud REST
//! APIs; [`memory`] provides in-process implementations for dry runs and tests.

pub mod auth;
pub mod docker;
pub mod gcs;
pub mod http;
pub mod memory;
pub mod monitoring;
pub mod vertex;

use crate::monitoring::MetricDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub use auth::TokenSource;
pub use docker::DockerCli;
pub use gcs::GcsClient;
pub use memory::{
    InMemoryContainerEngine, InMemoryMetricService, InMemoryObjectStore, InMemoryPlatform,
    InMemoryServices,
};
pub use monitoring::CloudMonitoringClient;
pub use vertex::VertexAiClient;

pub type ClientResult<T> = Result<T, ClientError>;

/// Failures reported by remote service clients
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Command `{command}` failed: {message}")]
    Process { command: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Long-running operation {operation} failed: {message}")]
    Operation { operation: String, message: String },

    #[error("Timeout waiting for operation: {operation}")]
    Timeout { operation: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn process(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Process {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Builds and publishes container images
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Build the image described by `context_dir/Dockerfile` and tag it
    async fn build(&self, context_dir: &Path, tag: &str) -> ClientResult<()>;

    /// Push a previously built tag to its registry
    async fn push(&self, tag: &str) -> ClientResult<()>;
}

/// Bucket/object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> ClientResult<bool>;

    /// Create a bucket; reports [`ClientError::Conflict`] if it already exists
    async fn create_bucket(&self, bucket: &str) -> ClientResult<()>;

    /// Upload a local file, replacing any object at the same name
    async fn upload_object(&self, bucket: &str, object: &str, source: &Path) -> ClientResult<()>;

    async fn delete_object(&self, bucket: &str, object: &str) -> ClientResult<()>;
}

/// Model registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUpload {
    pub display_name: String,
    /// Directory URI holding the artifact
    pub artifact_uri: String,
    pub serving_image_uri: String,
}

/// Request to put a registered model behind a prediction endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDeployment {
    pub model_resource_name: String,
    pub display_name: String,
    pub machine_type: String,
    pub min_replica_count: u32,
    pub max_replica_count: u32,
}

/// Managed model serving platform
#[async_trait]
pub trait PredictionPlatform: Send + Sync {
    /// Register a model resource and return its resource name
    async fn upload_model(&self, request: &ModelUpload) -> ClientResult<String>;

    /// Create an endpoint, deploy the model to it and return the endpoint resource name
    async fn deploy_model(&self, request: &EndpointDeployment) -> ClientResult<String>;

    async fn delete_model(&self, model_resource_name: &str) -> ClientResult<()>;
}

/// Custom metric registry
#[async_trait]
pub trait MetricService: Send + Sync {
    /// Create a descriptor; reports [`ClientError::Conflict`] on duplicates
    async fn create_metric_descriptor(
        &self,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> ClientResult<()>;
}
