use crate::config::DeploymentConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Parameters of one `deploy` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub model_path: PathBuf,
    pub bucket_name: String,
    /// Raw target name, parsed when the pipeline dispatches
    pub target: String,
    /// Derived from the artifact file name when absent
    pub endpoint_name: Option<String>,
    pub framework: String,
    pub version: String,
    pub custom_requirements: Option<BTreeMap<String, String>>,
}

impl DeploymentRequest {
    pub fn new(
        model_path: impl Into<PathBuf>,
        bucket_name: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            bucket_name: bucket_name.into(),
            target: target.into(),
            endpoint_name: None,
            framework: "sklearn".to_string(),
            version: "1.0".to_string(),
            custom_requirements: None,
        }
    }

    pub fn with_endpoint_name(mut self, endpoint_name: impl Into<String>) -> Self {
        self.endpoint_name = Some(endpoint_name.into());
        self
    }

    pub fn with_framework(
        mut self,
        framework: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.framework = framework.into();
        self.version = version.into();
        self
    }

    pub fn with_requirements(mut self, requirements: BTreeMap<String, String>) -> Self {
        self.custom_requirements = Some(requirements);
        self
    }

    /// Map a deployment document onto the call: `model_name` becomes the endpoint name
    pub fn from_config(config: &DeploymentConfig, model_path: impl AsRef<Path>) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            bucket_name: config.bucket_name.clone(),
            target: config.deployment.target.clone(),
            endpoint_name: Some(config.model_name.clone()),
            framework: config.framework.name.clone(),
            version: config.framework.version.clone(),
            custom_requirements: config.custom_requirements.clone(),
        }
    }

    /// Non-empty custom requirements
    pub fn requirements(&self) -> Option<&BTreeMap<String, String>> {
        self.custom_requirements.as_ref().filter(|reqs| !reqs.is_empty())
    }

    /// Supplied endpoint name, ignoring blanks
    pub fn explicit_endpoint_name(&self) -> Option<&str> {
        self.endpoint_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn test_defaults() {
        let request = DeploymentRequest::new("model.pkl", "b1", "vertex_ai");
        assert_eq!(request.framework, "sklearn");
        assert_eq!(request.version, "1.0");
        assert!(request.explicit_endpoint_name().is_none());
        assert!(request.requirements().is_none());
    }

    #[test]
    fn test_blank_endpoint_name_is_ignored() {
        let request =
            DeploymentRequest::new("model.pkl", "b1", "vertex_ai").with_endpoint_name("  ");
        assert!(request.explicit_endpoint_name().is_none());
    }

    #[test]
    fn test_from_config_maps_fields() {
        let config = ConfigLoader::load_from_str(
            "model_name: churn\nproject_id: p1\nregion: us-central1\nbucket_name: b1\n\
             deployment:\n  target: vertex_ai\nframework:\n  name: xgboost\n  version: \"1.7\"\n\
             custom_requirements:\n  pandas: \"1.5.0\"\n",
        )
        .unwrap();

        let request = DeploymentRequest::from_config(&config, "models/model.pkl");
        assert_eq!(request.bucket_name, "b1");
        assert_eq!(request.target, "vertex_ai");
        assert_eq!(request.explicit_endpoint_name(), Some("churn"));
        assert_eq!(request.framework, "xgboost");
        assert_eq!(request.version, "1.7");
        assert_eq!(
            request.requirements().and_then(|r| r.get("pandas")).map(String::as_str),
            Some("1.5.0")
        );
    }
}
