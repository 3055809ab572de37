use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a component's lifecycle within one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Start,
    Success,
    Failure,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

/// Event emitted by a pipeline component to the observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub component: String,
    pub phase: LifecyclePhase,
    pub message: String,
    pub published_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn new(
        component: impl Into<String>,
        phase: LifecyclePhase,
        message: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            phase,
            message: message.into(),
            published_at: Utc::now(),
        }
    }
}
