//! Vertex AI REST client.
//!
//! Model upload, endpoint creation and model deployment are long-running
//! operations on the platform side. Each call here submits the request and
//! then polls the returned operation until it is done, so that callers see a
//! single unit of work.

use super::http::{build_http_client, check_response};
use super::{
    ClientError, ClientResult, EndpointDeployment, ModelUpload, PredictionPlatform, TokenSource,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationStatus>,
    #[serde(default)]
    response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// [`PredictionPlatform`] over the Vertex AI v1 API
#[derive(Debug, Clone)]
pub struct VertexAiClient {
    client: Client,
    api_base: String,
    project_id: String,
    region: String,
    token: TokenSource,
    poll_interval: Duration,
    operation_timeout: Duration,
}

impl VertexAiClient {
    pub fn new(
        api_base: impl Into<String>,
        project_id: impl Into<String>,
        region: impl Into<String>,
        token: TokenSource,
        request_timeout: Duration,
    ) -> ClientResult<Self> {
        Ok(Self {
            client: build_http_client(request_timeout)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            region: region.into(),
            token,
            poll_interval: Duration::from_secs(10),
            operation_timeout: Duration::from_secs(3600),
        })
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.operation_timeout = timeout;
        self
    }

    fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.region)
    }

    async fn post(&self, resource_path: &str, body: &Value) -> ClientResult<Operation> {
        let url = format!("{}/v1/{resource_path}", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.bearer().await?)
            .json(body)
            .send()
            .await?;

        let response = check_response(response, resource_path).await?;
        Ok(response.json::<Operation>().await?)
    }

    /// Poll an operation until it completes, returning its `response` payload
    async fn wait(&self, mut operation: Operation) -> ClientResult<Value> {
        let started = Instant::now();

        loop {
            if operation.done {
                if let Some(status) = operation.error {
                    return Err(ClientError::Operation {
                        operation: operation.name,
                        message: format!("code {}: {}", status.code, status.message),
                    });
                }
                return Ok(operation.response.unwrap_or(Value::Null));
            }

            if started.elapsed() > self.operation_timeout {
                return Err(ClientError::Timeout {
                    operation: operation.name,
                });
            }

            debug!(operation = %operation.name, "Waiting for operation");
            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/v1/{}", self.api_base, operation.name);
            let response = self
                .client
                .get(&url)
                .bearer_auth(self.token.bearer().await?)
                .send()
                .await?;
            operation = check_response(response, &operation.name)
                .await?
                .json::<Operation>()
                .await?;
        }
    }

    fn string_field(payload: &Value, field: &str) -> ClientResult<String> {
        payload
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ClientError::InvalidResponse(format!("operation response lacks `{field}`"))
            })
    }
}

#[async_trait]
impl PredictionPlatform for VertexAiClient {
    async fn upload_model(&self, request: &ModelUpload) -> ClientResult<String> {
        info!(
            display_name = %request.display_name,
            image = %request.serving_image_uri,
            "Registering model"
        );

        let body = json!({
            "model": {
                "displayName": request.display_name,
                "artifactUri": request.artifact_uri,
                "containerSpec": { "imageUri": request.serving_image_uri },
            }
        });
        let operation = self.post(&format!("{}/models:upload", self.parent()), &body).await?;
        let payload = self.wait(operation).await?;
        Self::string_field(&payload, "model")
    }

    async fn deploy_model(&self, request: &EndpointDeployment) -> ClientResult<String> {
        info!(
            model = %request.model_resource_name,
            machine_type = %request.machine_type,
            min_replicas = request.min_replica_count,
            max_replicas = request.max_replica_count,
            "Deploying model to new endpoint"
        );

        let endpoint_body = json!({ "displayName": format!("{}_endpoint", request.display_name) });
        let operation = self.post(&format!("{}/endpoints", self.parent()), &endpoint_body).await?;
        let endpoint = Self::string_field(&self.wait(operation).await?, "name")?;

        let deploy_body = json!({
            "deployedModel": {
                "model": request.model_resource_name,
                "displayName": request.display_name,
                "dedicatedResources": {
                    "machineSpec": { "machineType": request.machine_type },
                    "minReplicaCount": request.min_replica_count,
                    "maxReplicaCount": request.max_replica_count,
                },
            },
            "trafficSplit": { "0": 100 },
        });
        let operation = self.post(&format!("{endpoint}:deployModel"), &deploy_body).await?;
        self.wait(operation).await?;

        Ok(endpoint)
    }

    async fn delete_model(&self, model_resource_name: &str) -> ClientResult<()> {
        let url = format!("{}/v1/{model_resource_name}", self.api_base);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(self.token.bearer().await?)
            .send()
            .await?;
        check_response(response, model_resource_name).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_deserializes_with_defaults() {
        let op: Operation = serde_json::from_value(json!({
            "name": "projects/p1/locations/r/operations/1"
        }))
        .unwrap();
        assert!(!op.done);
        assert!(op.error.is_none());
    }

    #[tokio::test]
    async fn test_finished_operation_with_error_fails() {
        let client = VertexAiClient::new(
            "http://localhost:1",
            "p1",
            "us-central1",
            TokenSource::Static("t".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();

        let op: Operation = serde_json::from_value(json!({
            "name": "operations/9",
            "done": true,
            "error": { "code": 8, "message": "quota exhausted" }
        }))
        .unwrap();

        let err = client.wait(op).await.unwrap_err();
        assert!(err.to_string().contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_finished_operation_returns_response() {
        let client = VertexAiClient::new(
            "http://localhost:1",
            "p1",
            "us-central1",
            TokenSource::Static("t".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();

        let op: Operation = serde_json::from_value(json!({
            "name": "operations/10",
            "done": true,
            "response": { "model": "projects/p1/locations/us-central1/models/42" }
        }))
        .unwrap();

        let payload = client.wait(op).await.unwrap();
        assert_eq!(
            VertexAiClient::string_field(&payload, "model").unwrap(),
            "projects/p1/locations/us-central1/models/42"
        );
    }
}
