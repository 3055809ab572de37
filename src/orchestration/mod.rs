//! # Deployment Orchestration
//!
//! Drives a single model deployment from a local artifact to a serving
//! endpoint.
//!
//! ## Core Components
//!
//! - **DeploymentOrchestrator**: sequences validation, upload and the target strategy
//! - **DeploymentStrategy**: per-target deployment (`vertex_ai`, `ray`)
//! - **DeploymentJournal**: completed steps and final state of one run
//! - **CompensationHook**: optional undo of completed steps after a failure

pub mod compensation;
pub mod journal;
pub mod orchestrator;
pub mod request;
pub mod target;

pub use compensation::{CleanupCompensation, CompensationHook};
pub use journal::{CompletedStep, DeploymentJournal, DeploymentState, DeploymentStep};
pub use orchestrator::DeploymentOrchestrator;
pub use request::DeploymentRequest;
pub use target::{
    DeploymentStrategy, DeploymentTarget, RayStrategy, TargetDeployment, VertexAiStrategy,
};
