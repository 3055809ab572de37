//! # Containerizer
//!
//! Builds a serving image that layers extra Python packages on top of the
//! framework's prebuilt prediction image, then pushes it to the registry.
//!
//! Each build gets its own temporary context directory. The directory is
//! removed on every exit path: explicitly after the build settles, and by
//! `TempDir`'s drop if the future is cancelled or unwinds.

use crate::clients::ContainerEngine;
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "containerizer";
const MANIFEST_NAME: &str = "Dockerfile";
const MODEL_NAME_IN_CONTEXT: &str = "model";

/// Image a model is served from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub registry_uri: String,
    pub framework: String,
    pub version: String,
    /// Built by the containerizer rather than a prebuilt framework image
    pub is_custom: bool,
}

impl ContainerImage {
    /// Prebuilt framework image, `<registry>/<framework>-cpu.<1-0>:latest`
    pub fn prebuilt(registry: &str, framework: &str, version: &str) -> Self {
        Self {
            registry_uri: format!(
                "{}/{framework}-cpu.{}:latest",
                registry.trim_end_matches('/'),
                version.replace('.', "-")
            ),
            framework: framework.to_string(),
            version: version.to_string(),
            is_custom: false,
        }
    }
}

impl fmt::Display for ContainerImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.registry_uri)
    }
}

/// Render the build manifest: base image, the model, one pinned install per package
pub fn render_build_manifest(
    base_image: &str,
    custom_requirements: &BTreeMap<String, String>,
) -> String {
    let mut manifest = format!(
        "FROM {base_image}\n\nWORKDIR /app\n\n\
         COPY {MODEL_NAME_IN_CONTEXT} /app/{MODEL_NAME_IN_CONTEXT}\n"
    );

    if !custom_requirements.is_empty() {
        manifest.push('\n');
        for (package, version) in custom_requirements {
            manifest.push_str(&format!("RUN pip install --no-cache-dir {package}=={version}\n"));
        }
    }

    manifest
}

pub struct Containerizer {
    project_id: String,
    engine: Arc<dyn ContainerEngine>,
    /// Host custom images are pushed to
    image_registry: String,
    /// Registry of the prebuilt framework images used as base
    base_image_registry: String,
    build_root: PathBuf,
    events: EventPublisher,
}

impl Containerizer {
    pub fn new(
        project_id: impl Into<String>,
        engine: Arc<dyn ContainerEngine>,
        events: EventPublisher,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            engine,
            image_registry: "gcr.io".to_string(),
            base_image_registry: "us-docker.pkg.dev/vertex-ai/prediction".to_string(),
            build_root: std::env::temp_dir(),
            events,
        }
    }

    pub fn with_registries(
        mut self,
        image_registry: impl Into<String>,
        base_image_registry: impl Into<String>,
    ) -> Self {
        self.image_registry = image_registry.into();
        self.base_image_registry = base_image_registry.into();
        self
    }

    pub fn with_build_root(mut self, build_root: impl Into<PathBuf>) -> Self {
        self.build_root = build_root.into();
        self
    }

    pub fn base_image_registry(&self) -> &str {
        &self.base_image_registry
    }

    /// `<registry>/<project>/vertex-ai-model:<version>`
    pub fn image_tag(&self, version: &str) -> String {
        format!(
            "{}/{}/vertex-ai-model:{version}",
            self.image_registry.trim_end_matches('/'),
            self.project_id
        )
    }

    pub async fn build_serving_container(
        &self,
        model_path: &Path,
        framework: &str,
        version: &str,
        custom_requirements: &BTreeMap<String, String>,
    ) -> Result<ContainerImage> {
        let tag = self.image_tag(version);
        self.events.start(
            COMPONENT,
            format!(
                "Building {tag} with {} custom requirement(s)",
                custom_requirements.len()
            ),
        );

        let result = self
            .build_in_scoped_context(model_path, framework, version, custom_requirements, &tag)
            .await;

        match result {
            Ok(()) => {
                self.events.success(COMPONENT, format!("Pushed {tag}"));
                Ok(ContainerImage {
                    registry_uri: tag,
                    framework: framework.to_string(),
                    version: version.to_string(),
                    is_custom: true,
                })
            }
            Err(e) => {
                self.events.failure(COMPONENT, e.to_string());
                Err(e)
            }
        }
    }

    async fn build_in_scoped_context(
        &self,
        model_path: &Path,
        framework: &str,
        version: &str,
        custom_requirements: &BTreeMap<String, String>,
        tag: &str,
    ) -> Result<()> {
        let build_dir = tempfile::Builder::new()
            .prefix("model-build-")
            .tempdir_in(&self.build_root)
            .map_err(|e| {
                DeployerError::container_build(format!(
                    "Failed to create build directory in {}: {e}",
                    self.build_root.display()
                ))
            })?;
        debug!(build_dir = %build_dir.path().display(), "Created build context");

        let outcome = self
            .build_and_push(
                build_dir.path(),
                model_path,
                framework,
                version,
                custom_requirements,
                tag,
            )
            .await;

        let build_path = build_dir.path().to_path_buf();
        if let Err(e) = build_dir.close() {
            // Never replaces the build outcome
            warn!(
                build_dir = %build_path.display(),
                error = %e,
                "Failed to remove build directory"
            );
        }

        outcome
    }

    async fn build_and_push(
        &self,
        context: &Path,
        model_path: &Path,
        framework: &str,
        version: &str,
        custom_requirements: &BTreeMap<String, String>,
        tag: &str,
    ) -> Result<()> {
        let base_image = ContainerImage::prebuilt(&self.base_image_registry, framework, version);
        let manifest = render_build_manifest(&base_image.registry_uri, custom_requirements);

        tokio::fs::write(context.join(MANIFEST_NAME), manifest)
            .await
            .map_err(|e| {
                DeployerError::container_build(format!("Failed to write build manifest: {e}"))
            })?;

        tokio::fs::copy(model_path, context.join(MODEL_NAME_IN_CONTEXT))
            .await
            .map_err(|e| {
                DeployerError::container_build(format!(
                    "Failed to copy {} into build context: {e}",
                    model_path.display()
                ))
            })?;

        self.engine
            .build(context, tag)
            .await
            .map_err(|e| {
                DeployerError::container_build(format!("Image build failed for {tag}: {e}"))
            })?;

        self.engine
            .push(tag)
            .await
            .map_err(|e| {
                DeployerError::container_build(format!("Image push failed for {tag}: {e}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryContainerEngine;

    fn requirements(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prebuilt_image_reference() {
        let image =
            ContainerImage::prebuilt("us-docker.pkg.dev/vertex-ai/prediction", "sklearn", "1.0");
        assert_eq!(
            image.registry_uri,
            "us-docker.pkg.dev/vertex-ai/prediction/sklearn-cpu.1-0:latest"
        );
        assert!(!image.is_custom);
    }

    #[test]
    fn test_manifest_pins_each_requirement_once() {
        let manifest = render_build_manifest(
            "base:latest",
            &requirements(&[("pandas", "1.5.0"), ("numpy", "1.24.0")]),
        );

        assert!(manifest.starts_with("FROM base:latest\n"));
        assert!(manifest.contains("COPY model /app/model"));
        assert_eq!(manifest.matches("pandas==1.5.0").count(), 1);
        assert_eq!(manifest.matches("numpy==1.24.0").count(), 1);
        assert_eq!(manifest.matches("RUN pip install").count(), 2);
    }

    #[test]
    fn test_manifest_without_requirements_has_no_install_step() {
        let manifest = render_build_manifest("base:latest", &BTreeMap::new());
        assert!(!manifest.contains("pip install"));
    }

    #[test]
    fn test_image_tag() {
        let containerizer = Containerizer::new(
            "p1",
            Arc::new(InMemoryContainerEngine::new()),
            EventPublisher::default(),
        );
        assert_eq!(containerizer.image_tag("1.0"), "gcr.io/p1/vertex-ai-model:1.0");
    }

    #[tokio::test]
    async fn test_missing_model_file_fails_and_cleans_up() {
        let build_root = tempfile::tempdir().unwrap();
        let engine = Arc::new(InMemoryContainerEngine::new());
        let containerizer = Containerizer::new("p1", engine.clone(), EventPublisher::default())
            .with_build_root(build_root.path());

        let err = containerizer
            .build_serving_container(
                Path::new("/missing/model.pkl"),
                "sklearn",
                "1.0",
                &requirements(&[("pandas", "1.5.0")]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, DeployerError::ContainerBuild(_)));
        assert!(engine.builds().is_empty());
        assert_eq!(std::fs::read_dir(build_root.path()).unwrap().count(), 0);
    }
}
