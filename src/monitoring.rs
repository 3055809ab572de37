//! # Monitoring Registrar
//!
//! Registers the prediction-latency gauge for a project. The descriptor is
//! project-scoped; endpoints are associated with it by living in the same
//! project, not by reference.
//!
//! ```rust
//! use model_deployer::clients::InMemoryMetricService;
//! use model_deployer::events::EventPublisher;
//! use model_deployer::monitoring::MonitoringRegistrar;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let metrics = Arc::new(InMemoryMetricService::new());
//! let registrar = MonitoringRegistrar::new(metrics.clone(), EventPublisher::default());
//!
//! // Registering twice is not an error
//! registrar.register_latency_metric("my-project").await.unwrap();
//! registrar.register_latency_metric("my-project").await.unwrap();
//! assert_eq!(metrics.descriptor_count("my-project"), 1);
//! # });
//! ```

use crate::clients::MetricService;
use crate::error::{DeployerError, Result};
use crate::events::EventPublisher;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const PREDICTION_LATENCY_METRIC: &str = "custom.googleapis.com/ml/model/prediction_latency";

const COMPONENT: &str = "monitoring_registrar";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    Gauge,
    Delta,
    Cumulative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Bool,
    Int64,
    Double,
    String,
    Distribution,
}

/// Custom metric descriptor in the monitoring API's wire shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    #[serde(rename = "type")]
    pub metric_type: String,
    pub metric_kind: MetricKind,
    pub value_type: ValueType,
    pub description: String,
}

impl MetricDescriptor {
    pub fn prediction_latency() -> Self {
        Self {
            metric_type: PREDICTION_LATENCY_METRIC.to_string(),
            metric_kind: MetricKind::Gauge,
            value_type: ValueType::Double,
            description: "Model prediction latency".to_string(),
        }
    }
}

pub struct MonitoringRegistrar {
    service: Arc<dyn MetricService>,
    events: EventPublisher,
}

impl MonitoringRegistrar {
    pub fn new(service: Arc<dyn MetricService>, events: EventPublisher) -> Self {
        Self { service, events }
    }

    /// Create the latency descriptor; an existing descriptor counts as success
    pub async fn register_latency_metric(&self, project_id: &str) -> Result<()> {
        let descriptor = MetricDescriptor::prediction_latency();

        match self
            .service
            .create_metric_descriptor(project_id, &descriptor)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_conflict() => {
                info!(
                    project_id = %project_id,
                    metric_type = %descriptor.metric_type,
                    "Metric descriptor already registered"
                );
                Ok(())
            }
            Err(e) => Err(DeployerError::monitoring(format!(
                "Failed to register {} in project {project_id}: {e}",
                descriptor.metric_type
            ))),
        }
    }

    /// Attach basic monitoring for a freshly deployed endpoint
    pub async fn setup_monitoring(
        &self,
        project_id: &str,
        endpoint_resource_name: &str,
    ) -> Result<()> {
        self.events.start(
            COMPONENT,
            format!("Registering latency metric for {endpoint_resource_name}"),
        );

        match self.register_latency_metric(project_id).await {
            Ok(()) => {
                self.events.success(
                    COMPONENT,
                    format!(
                        "Latency metric available in project {project_id} \
                         for {endpoint_resource_name}"
                    ),
                );
                Ok(())
            }
            Err(e) => {
                self.events.failure(COMPONENT, e.to_string());
                Err(e)
            }
        }
    }
}
