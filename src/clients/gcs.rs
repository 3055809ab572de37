use super::http::{build_http_client, check_response};
use super::{ClientError, ClientResult, ObjectStore, TokenSource};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// [`ObjectStore`] over the Cloud Storage JSON API
#[derive(Debug, Clone)]
pub struct GcsClient {
    client: Client,
    base_url: Url,
    project_id: String,
    token: TokenSource,
}

impl GcsClient {
    pub fn new(
        base_url: &str,
        project_id: impl Into<String>,
        token: TokenSource,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ClientError::InvalidResponse(format!("Invalid storage API URL {base_url}: {e}"))
        })?;

        Ok(Self {
            client: build_http_client(timeout)?,
            base_url,
            project_id: project_id.into(),
            token,
        })
    }

    /// Build `<base>/<segments...>`, percent-encoding each segment
    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ClientError::InvalidResponse(format!(
                    "Storage API URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn bucket_exists(&self, bucket: &str) -> ClientResult<bool> {
        let url = self.url(&["storage", "v1", "b", bucket])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.bearer().await?)
            .send()
            .await?;

        match check_response(response, bucket).await {
            Ok(_) => Ok(true),
            Err(ClientError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> ClientResult<()> {
        let url = self.url(&["storage", "v1", "b"])?;
        info!(bucket = %bucket, project_id = %self.project_id, "Creating bucket");

        let response = self
            .client
            .post(url)
            .query(&[("project", self.project_id.as_str())])
            .bearer_auth(self.token.bearer().await?)
            .json(&json!({ "name": bucket }))
            .send()
            .await?;

        check_response(response, bucket).await?;
        Ok(())
    }

    async fn upload_object(&self, bucket: &str, object: &str, source: &Path) -> ClientResult<()> {
        let body = tokio::fs::read(source).await?;
        let url = self.url(&["upload", "storage", "v1", "b", bucket, "o"])?;
        debug!(bucket = %bucket, object = %object, bytes = body.len(), "Uploading object");

        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "media"), ("name", object)])
            .bearer_auth(self.token.bearer().await?)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        check_response(response, &format!("gs://{bucket}/{object}")).await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, object: &str) -> ClientResult<()> {
        let url = self.url(&["storage", "v1", "b", bucket, "o", object])?;
        let response = self
            .client
            .delete(url)
            .bearer_auth(self.token.bearer().await?)
            .send()
            .await?;

        check_response(response, &format!("gs://{bucket}/{object}")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_names_are_encoded_as_one_segment() {
        let client = GcsClient::new(
            "https://storage.googleapis.com",
            "p1",
            TokenSource::Static("t".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();

        let url = client
            .url(&["storage", "v1", "b", "b1", "o", "models/churn/model.pkl"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/b1/o/models%2Fchurn%2Fmodel.pkl"
        );
    }
}
