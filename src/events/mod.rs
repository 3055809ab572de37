pub mod publisher;
pub mod types;

pub use publisher::EventPublisher;
pub use types::{LifecycleEvent, LifecyclePhase};
