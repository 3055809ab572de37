#![allow(clippy::doc_markdown)] // Allow technical terms like GCS, YAML in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Model Deployer
//!
//! Takes a trained model artifact from local disk to a live prediction
//! endpoint.
//!
//! ## Overview
//!
//! A deployment validates the artifact, uploads it to object storage under a
//! logical name, optionally builds a serving image with extra Python
//! packages, registers the model with the serving platform and deploys it
//! behind an endpoint. A latency metric descriptor can then be registered for
//! the endpoint.
//!
//! ## Module Organization
//!
//! - [`artifact`] - Artifact format validation
//! - [`storage`] - Bucket get-or-create and artifact upload
//! - [`containerizer`] - Serving image selection and scoped custom builds
//! - [`endpoint`] - Model registration and endpoint deployment
//! - [`monitoring`] - Custom metric registration
//! - [`orchestration`] - Pipeline sequencing, targets and the deployment journal
//! - [`clients`] - Traits and implementations for the remote services
//! - [`services`] - Wiring of clients into components
//! - [`config`] - Deployment documents and runtime settings
//! - [`error`] - Structured error handling
//! - [`events`] - Lifecycle events
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use model_deployer::config::RuntimeSettings;
//! use model_deployer::orchestration::DeploymentRequest;
//! use model_deployer::services::DeploymentServices;
//!
//! # async fn example() -> model_deployer::Result<()> {
//! let settings = RuntimeSettings::from_env()?;
//! let services = DeploymentServices::production("my-project", "us-central1", settings)?;
//!
//! let request = DeploymentRequest::new("model.pkl", "my-bucket", "vertex_ai");
//! let endpoint = services.orchestrator().deploy(&request).await?;
//!
//! services.monitoring().setup_monitoring("my-project", &endpoint).await?;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod clients;
pub mod config;
pub mod containerizer;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod logging;
pub mod monitoring;
pub mod orchestration;
pub mod services;
pub mod storage;

pub use artifact::{ArtifactFormat, ModelArtifact};
pub use config::{ConfigLoader, DeploymentConfig, RuntimeSettings};
pub use containerizer::{ContainerImage, Containerizer};
pub use endpoint::{DeployedEndpoint, EndpointDeployer};
pub use error::{DeployerError, Result};
pub use events::{EventPublisher, LifecycleEvent, LifecyclePhase};
pub use monitoring::MonitoringRegistrar;
pub use orchestration::{DeploymentOrchestrator, DeploymentRequest, DeploymentTarget};
pub use services::DeploymentServices;
pub use storage::{StorageLocation, StoragePublisher};
