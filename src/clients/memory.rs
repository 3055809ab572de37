//! In-process implementations of the remote service traits.
//!
//! They keep everything in memory, record the calls they receive and can be
//! told to fail, which makes them the backing for `--dry-run` deployments and
//! for the test suites.

use super::{
    ClientError, ClientResult, ContainerEngine, EndpointDeployment, MetricService, ModelUpload,
    ObjectStore, PredictionPlatform,
};
use crate::monitoring::MetricDescriptor;
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of one image build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub tag: String,
    /// Dockerfile contents at build time
    pub manifest: String,
    /// File names present in the build context
    pub context_files: Vec<String>,
    pub context_dir: std::path::PathBuf,
}

#[derive(Debug, Default)]
pub struct InMemoryContainerEngine {
    builds: Mutex<Vec<BuildRecord>>,
    pushes: Mutex<Vec<String>>,
    build_failure: Mutex<Option<String>>,
    push_failure: Mutex<Option<String>>,
}

impl InMemoryContainerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_builds(&self, message: impl Into<String>) {
        *self.build_failure.lock() = Some(message.into());
    }

    pub fn fail_pushes(&self, message: impl Into<String>) {
        *self.push_failure.lock() = Some(message.into());
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.builds.lock().clone()
    }

    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().clone()
    }
}

#[async_trait]
impl ContainerEngine for InMemoryContainerEngine {
    async fn build(&self, context_dir: &Path, tag: &str) -> ClientResult<()> {
        let manifest = tokio::fs::read_to_string(context_dir.join("Dockerfile")).await?;
        let mut context_files = Vec::new();
        let mut entries = tokio::fs::read_dir(context_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            context_files.push(entry.file_name().to_string_lossy().into_owned());
        }
        context_files.sort();

        self.builds.lock().push(BuildRecord {
            tag: tag.to_string(),
            manifest,
            context_files,
            context_dir: context_dir.to_path_buf(),
        });

        match self.build_failure.lock().clone() {
            Some(message) => Err(ClientError::process("build", message)),
            None => Ok(()),
        }
    }

    async fn push(&self, tag: &str) -> ClientResult<()> {
        if let Some(message) = self.push_failure.lock().clone() {
            return Err(ClientError::process("push", message));
        }
        self.pushes.lock().push(tag.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: DashMap<String, DashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    creations: AtomicUsize,
    lose_creation_race: AtomicBool,
    upload_failure: Mutex<Option<String>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(self, bucket: &str) -> Self {
        self.buckets.insert(bucket.to_string(), DashMap::new());
        self
    }

    /// Make the next bucket creation behave as if a concurrent caller created it first
    pub fn lose_next_creation_race(&self) {
        self.lose_creation_race.store(true, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, message: impl Into<String>) {
        *self.upload_failure.lock() = Some(message.into());
    }

    /// Total number of calls received through [`ObjectStore`]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of successful bucket creations issued by callers
    pub fn creation_count(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.contains_key(bucket)
    }

    pub fn object_names(&self, bucket: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .buckets
            .get(bucket)
            .map(|objects| objects.iter().map(|entry| entry.key().clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.buckets
            .get(bucket)
            .and_then(|objects| objects.get(object).map(|data| data.clone()))
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> ClientResult<bool> {
        self.touch();
        Ok(self.buckets.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        self.touch();
        if self.lose_creation_race.swap(false, Ordering::SeqCst) {
            self.buckets.entry(bucket.to_string()).or_default();
            return Err(ClientError::Conflict(bucket.to_string()));
        }

        match self.buckets.entry(bucket.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ClientError::Conflict(bucket.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(DashMap::new());
                self.creations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn upload_object(&self, bucket: &str, object: &str, source: &Path) -> ClientResult<()> {
        self.touch();
        if let Some(message) = self.upload_failure.lock().clone() {
            return Err(ClientError::api(403, message));
        }

        let data = tokio::fs::read(source).await?;
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::NotFound(bucket.to_string()))?;
        objects.insert(object.to_string(), data);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, object: &str) -> ClientResult<()> {
        self.touch();
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| ClientError::NotFound(bucket.to_string()))?;
        objects
            .remove(object)
            .map(|_| ())
            .ok_or_else(|| ClientError::NotFound(format!("gs://{bucket}/{object}")))
    }
}

#[derive(Debug)]
pub struct InMemoryPlatform {
    project_id: String,
    region: String,
    next_id: AtomicUsize,
    uploads: Mutex<Vec<ModelUpload>>,
    deployments: Mutex<Vec<EndpointDeployment>>,
    deleted_models: Mutex<Vec<String>>,
    upload_failure: Mutex<Option<String>>,
    deploy_failure: Mutex<Option<String>>,
}

impl InMemoryPlatform {
    pub fn new(project_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            next_id: AtomicUsize::new(1),
            uploads: Mutex::new(Vec::new()),
            deployments: Mutex::new(Vec::new()),
            deleted_models: Mutex::new(Vec::new()),
            upload_failure: Mutex::new(None),
            deploy_failure: Mutex::new(None),
        }
    }

    pub fn fail_uploads(&self, message: impl Into<String>) {
        *self.upload_failure.lock() = Some(message.into());
    }

    pub fn fail_deployments(&self, message: impl Into<String>) {
        *self.deploy_failure.lock() = Some(message.into());
    }

    pub fn uploads(&self) -> Vec<ModelUpload> {
        self.uploads.lock().clone()
    }

    pub fn deployments(&self) -> Vec<EndpointDeployment> {
        self.deployments.lock().clone()
    }

    pub fn deleted_models(&self) -> Vec<String> {
        self.deleted_models.lock().clone()
    }

    fn resource_name(&self, collection: &str) -> String {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!(
            "projects/{}/locations/{}/{collection}/{id}",
            self.project_id, self.region
        )
    }
}

#[async_trait]
impl PredictionPlatform for InMemoryPlatform {
    async fn upload_model(&self, request: &ModelUpload) -> ClientResult<String> {
        if let Some(message) = self.upload_failure.lock().clone() {
            return Err(ClientError::api(400, message));
        }
        self.uploads.lock().push(request.clone());
        Ok(self.resource_name("models"))
    }

    async fn deploy_model(&self, request: &EndpointDeployment) -> ClientResult<String> {
        if let Some(message) = self.deploy_failure.lock().clone() {
            return Err(ClientError::Operation {
                operation: "deployModel".to_string(),
                message,
            });
        }
        self.deployments.lock().push(request.clone());
        Ok(self.resource_name("endpoints"))
    }

    async fn delete_model(&self, model_resource_name: &str) -> ClientResult<()> {
        self.deleted_models.lock().push(model_resource_name.to_string());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMetricService {
    descriptors: DashMap<(String, String), MetricDescriptor>,
    attempts: AtomicUsize,
}

impl InMemoryMetricService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor_count(&self, project_id: &str) -> usize {
        self.descriptors
            .iter()
            .filter(|entry| entry.key().0 == project_id)
            .count()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricService for InMemoryMetricService {
    async fn create_metric_descriptor(
        &self,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> ClientResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let key = (project_id.to_string(), descriptor.metric_type.clone());
        match self.descriptors.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(ClientError::Conflict(descriptor.metric_type.clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(descriptor.clone());
                Ok(())
            }
        }
    }
}

/// Every in-memory service, shared so tests can inspect what happened
#[derive(Debug, Clone)]
pub struct InMemoryServices {
    pub engine: Arc<InMemoryContainerEngine>,
    pub store: Arc<InMemoryObjectStore>,
    pub platform: Arc<InMemoryPlatform>,
    pub metrics: Arc<InMemoryMetricService>,
}

impl InMemoryServices {
    pub fn new(project_id: &str, region: &str) -> Self {
        Self {
            engine: Arc::new(InMemoryContainerEngine::new()),
            store: Arc::new(InMemoryObjectStore::new()),
            platform: Arc::new(InMemoryPlatform::new(project_id, region)),
            metrics: Arc::new(InMemoryMetricService::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_bucket_creation_conflicts() {
        let store = InMemoryObjectStore::new();
        store.create_bucket("b1").await.unwrap();
        let err = store.create_bucket("b1").await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.creation_count(), 1);
    }

    #[tokio::test]
    async fn test_platform_resource_names_are_scoped() {
        let platform = InMemoryPlatform::new("p1", "us-central1");
        let model = platform
            .upload_model(&ModelUpload {
                display_name: "churn".to_string(),
                artifact_uri: "gs://b1/models/churn".to_string(),
                serving_image_uri: "img".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(model, "projects/p1/locations/us-central1/models/1");
    }
}
