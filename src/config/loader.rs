//! Configuration Loader
//!
//! Reads a YAML deployment document, layers `MODEL_DEPLOYER__*` environment
//! overrides on top and validates that every required key is present before
//! deserializing.

use super::{DeploymentConfig, REQUIRED_FIELDS};
use crate::error::{DeployerError, Result};
use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides, e.g. `MODEL_DEPLOYER__BUCKET_NAME`
const ENV_PREFIX: &str = "MODEL_DEPLOYER";
const ENV_SEPARATOR: &str = "__";
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a deployment document from disk
    pub fn load(config_path: impl AsRef<Path>) -> Result<DeploymentConfig> {
        let path = config_path.as_ref();
        Self::check_config_file(path)?;

        debug!(config_path = %path.display(), "Loading deployment configuration");

        let source = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(Self::environment_overrides())
            .build()
            .map_err(|e| {
                DeployerError::configuration(format!(
                    "Failed to read {}: {e}",
                    path.display()
                ))
            })?;

        Self::finish(source)
    }

    /// Load a deployment document from an in-memory YAML string
    pub fn load_from_str(yaml: &str) -> Result<DeploymentConfig> {
        let source = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .map_err(|e| DeployerError::configuration(format!("Failed to parse document: {e}")))?;

        Self::finish(source)
    }

    fn environment_overrides() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
    }

    fn finish(source: Config) -> Result<DeploymentConfig> {
        for field in REQUIRED_FIELDS {
            if source.get::<config::Value>(field).is_err() {
                return Err(DeployerError::missing_field(field));
            }
        }

        let config: DeploymentConfig = source.try_deserialize().map_err(|e| {
            DeployerError::configuration(format!("Invalid deployment document: {e}"))
        })?;

        debug!(
            model_name = %config.model_name,
            project_id = %config.project_id,
            region = %config.region,
            target = %config.deployment.target,
            "Deployment configuration loaded"
        );

        Ok(config)
    }

    fn check_config_file(path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            DeployerError::configuration(format!("Cannot read {}: {e}", path.display()))
        })?;

        if !metadata.is_file() {
            return Err(DeployerError::configuration(format!(
                "Configuration path must point to a regular file: {}",
                path.display()
            )));
        }

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(DeployerError::configuration(format!(
                "Configuration file too large ({} bytes > {MAX_CONFIG_FILE_SIZE} bytes limit)",
                metadata.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CHURN: &str = r#"
model_name: churn
project_id: p1
region: us-central1
bucket_name: b1
deployment:
  target: vertex_ai
framework:
  name: sklearn
  version: "1.0"
"#;

    #[test]
    fn test_loads_complete_document() {
        let config = ConfigLoader::load_from_str(CHURN).unwrap();
        assert_eq!(config.model_name, "churn");
        assert_eq!(config.project_id, "p1");
        assert_eq!(config.bucket_name, "b1");
        assert_eq!(config.deployment.target, "vertex_ai");
        assert_eq!(config.framework.name, "sklearn");
        assert_eq!(config.framework.version, "1.0");
        assert!(config.requirements().is_none());
    }

    #[test]
    fn test_missing_required_field_is_named() {
        for field in REQUIRED_FIELDS {
            let yaml: String = CHURN
                .lines()
                .filter(|line| !line.starts_with(field))
                .collect::<Vec<_>>()
                .join("\n");
            let yaml = if field == "deployment" {
                yaml.replace("  target: vertex_ai", "")
            } else {
                yaml
            };

            let err = ConfigLoader::load_from_str(&yaml).unwrap_err();
            assert_eq!(err, DeployerError::missing_field(field), "field {field}");
        }
    }

    #[test]
    fn test_framework_defaults_when_absent() {
        let yaml = "model_name: m\nproject_id: p\nregion: r\nbucket_name: b\n\
                    deployment:\n  target: ray\n";
        let config = ConfigLoader::load_from_str(yaml).unwrap();
        assert_eq!(config.framework.name, "sklearn");
        assert_eq!(config.framework.version, "1.0");
    }

    #[test]
    fn test_custom_requirements_parsed() {
        let yaml = format!("{CHURN}custom_requirements:\n  pandas: \"1.5.0\"\n");
        let config = ConfigLoader::load_from_str(&yaml).unwrap();
        let reqs = config.requirements().unwrap();
        assert_eq!(reqs.get("pandas").map(String::as_str), Some("1.5.0"));
    }

    #[test]
    fn test_empty_requirements_treated_as_absent() {
        let yaml = format!("{CHURN}custom_requirements: {{}}\n");
        let config = ConfigLoader::load_from_str(&yaml).unwrap();
        assert!(config.requirements().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(CHURN.as_bytes()).unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.model_name, "churn");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = ConfigLoader::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, DeployerError::Configuration(_)));
    }
}
