//! # Storage Publisher
//!
//! Uploads artifacts to `gs://<bucket>/models/<logical name>/<file name>`,
//! creating the bucket on first use.

use crate::clients::ObjectStore;
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const COMPONENT: &str = "storage_publisher";
const SCHEME: &str = "gs";

/// Addressable location of an uploaded artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageLocation {
    bucket: String,
    object_path: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, logical_name: &str, file_name: &str) -> Self {
        Self {
            bucket: bucket.into(),
            object_path: format!("models/{logical_name}/{file_name}"),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    /// `gs://<bucket>/models/<logical name>/<file name>`
    pub fn uri(&self) -> String {
        format!("{SCHEME}://{}/{}", self.bucket, self.object_path)
    }

    /// Directory holding the artifact, which is what the serving platform loads from
    pub fn directory_uri(&self) -> String {
        match self.object_path.rsplit_once('/') {
            Some((dir, _)) => format!("{SCHEME}://{}/{dir}", self.bucket),
            None => format!("{SCHEME}://{}", self.bucket),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

pub struct StoragePublisher {
    store: Arc<dyn ObjectStore>,
    events: EventPublisher,
}

impl StoragePublisher {
    pub fn new(store: Arc<dyn ObjectStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    /// Upload `local_path` under `logical_name`, overwriting a previous upload
    pub async fn publish(
        &self,
        local_path: &Path,
        logical_name: &str,
        bucket_name: &str,
    ) -> Result<StorageLocation> {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                DeployerError::storage_publish(format!(
                    "Artifact path has no file name: {}",
                    local_path.display()
                ))
            })?;
        let location = StorageLocation::new(bucket_name, logical_name, &file_name);

        self.events.start(
            COMPONENT,
            format!("Uploading {} to {location}", local_path.display()),
        );

        match self.upload(local_path, &location).await {
            Ok(()) => {
                self.events.success(COMPONENT, format!("Uploaded {location}"));
                Ok(location)
            }
            Err(e) => {
                self.events.failure(COMPONENT, e.to_string());
                Err(e)
            }
        }
    }

    async fn upload(&self, local_path: &Path, location: &StorageLocation) -> Result<()> {
        self.ensure_bucket(location.bucket()).await?;

        self.store
            .upload_object(location.bucket(), location.object_path(), local_path)
            .await
            .map_err(|e| {
                DeployerError::storage_publish(format!("Upload to {location} failed: {e}"))
            })
    }

    /// Get-or-create. A failed create is reconciled by looking again: if the
    /// bucket is there now, somebody else created it and we carry on.
    pub async fn ensure_bucket(&self, bucket: &str) -> Result<()> {
        let exists = self.store.bucket_exists(bucket).await.map_err(|e| {
            DeployerError::storage_publish(format!("Failed to look up bucket {bucket}: {e}"))
        })?;
        if exists {
            debug!(bucket = %bucket, "Bucket exists");
            return Ok(());
        }

        info!(bucket = %bucket, "Bucket not found, creating");
        let create_error = match self.store.create_bucket(bucket).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        match self.store.bucket_exists(bucket).await {
            Ok(true) => {
                warn!(
                    bucket = %bucket,
                    error = %create_error,
                    "Bucket creation raced with another caller; using existing bucket"
                );
                Ok(())
            }
            _ => Err(DeployerError::storage_publish(format!(
                "Failed to create bucket {bucket}: {create_error}"
            ))),
        }
    }

    /// Delete a previously published artifact
    pub async fn remove(&self, location: &StorageLocation) -> Result<()> {
        self.store
            .delete_object(location.bucket(), location.object_path())
            .await
            .map_err(|e| {
                DeployerError::storage_publish(format!("Failed to delete {location}: {e}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InMemoryObjectStore;

    fn artifact(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("model.pkl");
        std::fs::write(&path, b"weights-v1").unwrap();
        path
    }

    #[test]
    fn test_location_uris() {
        let location = StorageLocation::new("b1", "churn", "model.pkl");
        assert_eq!(location.uri(), "gs://b1/models/churn/model.pkl");
        assert_eq!(location.directory_uri(), "gs://b1/models/churn");
        assert_eq!(location.to_string(), location.uri());
    }

    #[tokio::test]
    async fn test_publish_creates_missing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = StoragePublisher::new(store.clone(), EventPublisher::default());

        let location = publisher.publish(&artifact(&dir), "churn", "b1").await.unwrap();

        assert_eq!(location.uri(), "gs://b1/models/churn/model.pkl");
        assert!(store.has_bucket("b1"));
        assert_eq!(store.creation_count(), 1);
        assert_eq!(
            store.object("b1", "models/churn/model.pkl").as_deref(),
            Some(&b"weights-v1"[..])
        );
    }

    #[tokio::test]
    async fn test_creation_race_resolves_to_existing_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryObjectStore::new());
        store.lose_next_creation_race();
        let publisher = StoragePublisher::new(store.clone(), EventPublisher::default());

        let location = publisher.publish(&artifact(&dir), "churn", "b1").await.unwrap();

        assert_eq!(location.bucket(), "b1");
        assert_eq!(store.creation_count(), 0);
        assert_eq!(store.object_names("b1"), vec!["models/churn/model.pkl"]);
    }

    #[tokio::test]
    async fn test_upload_failure_is_storage_publish_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryObjectStore::new().with_bucket("b1"));
        store.fail_uploads("permission denied");
        let publisher = StoragePublisher::new(store, EventPublisher::default());

        let err = publisher.publish(&artifact(&dir), "churn", "b1").await.unwrap_err();
        assert!(matches!(err, DeployerError::StoragePublish(_)));
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_remove_deletes_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = StoragePublisher::new(store.clone(), EventPublisher::default());

        let location = publisher.publish(&artifact(&dir), "churn", "b1").await.unwrap();
        publisher.remove(&location).await.unwrap();

        assert!(store.object_names("b1").is_empty());
    }
}
