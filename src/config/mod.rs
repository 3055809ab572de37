//! # Deployment Configuration
//!
//! The deployment document describes one model publication: which project and
//! region to target, where the artifact is stored, the serving framework and
//! any extra Python packages the serving image needs.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use model_deployer::config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::load("configs/prod.yaml")?;
//! println!("Deploying {} to {}", config.model_name, config.region);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod settings;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use loader::ConfigLoader;
pub use settings::RuntimeSettings;

/// Keys that must be present in every deployment document
pub const REQUIRED_FIELDS: [&str; 5] = [
    "model_name",
    "project_id",
    "region",
    "deployment",
    "bucket_name",
];

/// Root deployment document
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeploymentConfig {
    /// Logical model name, also used as endpoint display name
    pub model_name: String,

    /// Cloud project owning every created resource
    pub project_id: String,

    /// Serving platform region (e.g. us-central1)
    pub region: String,

    /// Destination bucket for the artifact
    pub bucket_name: String,

    pub deployment: DeploymentSection,

    #[serde(default)]
    pub framework: FrameworkSpec,

    /// Extra packages pinned into a custom serving image
    #[serde(default)]
    pub custom_requirements: Option<BTreeMap<String, String>>,
}

/// Where the model gets deployed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeploymentSection {
    /// Raw target name; parsed into [`crate::orchestration::DeploymentTarget`] at dispatch
    pub target: String,
}

/// Serving framework and its version
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FrameworkSpec {
    pub name: String,
    pub version: String,
}

impl Default for FrameworkSpec {
    fn default() -> Self {
        Self {
            name: "sklearn".to_string(),
            version: "1.0".to_string(),
        }
    }
}

impl DeploymentConfig {
    /// Custom requirements, treating an empty mapping as absent
    pub fn requirements(&self) -> Option<&BTreeMap<String, String>> {
        self.custom_requirements.as_ref().filter(|reqs| !reqs.is_empty())
    }
}
