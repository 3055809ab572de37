//! Shared fixtures for the integration suites

#![allow(dead_code)]

use model_deployer::clients::InMemoryServices;
use model_deployer::config::RuntimeSettings;
use model_deployer::events::{LifecycleEvent, LifecyclePhase};
use model_deployer::services::DeploymentServices;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::broadcast;

pub const PROJECT_ID: &str = "test-project";
pub const REGION: &str = "us-central1";
pub const BUCKET: &str = "test-bucket";

/// In-memory services with a private workspace for artifacts and build contexts
pub struct TestHarness {
    workspace: TempDir,
    pub services: DeploymentServices,
    pub fakes: InMemoryServices,
}

impl TestHarness {
    pub fn new() -> Self {
        let workspace = tempfile::tempdir().expect("Failed to create test workspace");
        let build_root = workspace.path().join("builds");
        std::fs::create_dir_all(&build_root).expect("Failed to create build root");

        let settings = RuntimeSettings {
            build_root,
            ..RuntimeSettings::default()
        };
        let (services, fakes) = DeploymentServices::in_memory(PROJECT_ID, REGION, settings);

        Self {
            workspace,
            services,
            fakes,
        }
    }

    pub fn workspace(&self) -> &Path {
        self.workspace.path()
    }

    pub fn build_root(&self) -> &Path {
        &self.services.settings.build_root
    }

    /// Entries left under the build root
    pub fn leftover_build_dirs(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.build_root())
            .expect("Failed to read build root")
            .map(|entry| entry.expect("Failed to read entry").path())
            .collect()
    }

    /// Write a fake artifact into the workspace and return its path
    pub fn artifact(&self, file_name: &str) -> PathBuf {
        let path = self.workspace.path().join(file_name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create artifact directory");
        }
        std::fs::write(&path, b"serialized model").expect("Failed to write artifact");
        path
    }

    /// Write a deployment document into the workspace and return its path
    pub fn config_file(&self, yaml: &str) -> PathBuf {
        let path = self.workspace.path().join("deployment.yaml");
        std::fs::write(&path, yaml).expect("Failed to write config");
        path
    }
}

/// Deployment document for the churn example
pub fn churn_config() -> String {
    format!(
        "model_name: churn\n\
         project_id: {PROJECT_ID}\n\
         region: {REGION}\n\
         bucket_name: {BUCKET}\n\
         deployment:\n  target: vertex_ai\n\
         framework:\n  name: sklearn\n  version: \"1.0\"\n"
    )
}

/// Everything published so far, as (component, phase)
pub fn drain_events(
    receiver: &mut broadcast::Receiver<LifecycleEvent>,
) -> Vec<(String, LifecyclePhase)> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push((event.component, event.phase));
    }
    events
}
