pub mod deployment_services;

pub use deployment_services::DeploymentServices;
