use super::http::{build_http_client, check_response};
use super::{ClientResult, MetricService, TokenSource};
use crate::monitoring::MetricDescriptor;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// [`MetricService`] over the Cloud Monitoring v3 API
#[derive(Debug, Clone)]
pub struct CloudMonitoringClient {
    client: Client,
    api_base: String,
    token: TokenSource,
}

impl CloudMonitoringClient {
    pub fn new(
        api_base: impl Into<String>,
        token: TokenSource,
        timeout: Duration,
    ) -> ClientResult<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl MetricService for CloudMonitoringClient {
    async fn create_metric_descriptor(
        &self,
        project_id: &str,
        descriptor: &MetricDescriptor,
    ) -> ClientResult<()> {
        let url = format!("{}/v3/projects/{project_id}/metricDescriptors", self.api_base);
        info!(
            project_id = %project_id,
            metric_type = %descriptor.metric_type,
            "Creating metric descriptor"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.bearer().await?)
            .json(descriptor)
            .send()
            .await?;

        check_response(response, &descriptor.metric_type).await?;
        Ok(())
    }
}
