//! # Model Deployer CLI
//!
//! Deploys a model artifact to a prediction endpoint, either from a YAML
//! deployment document or from explicit flags. `--dry-run` swaps every
//! remote service for an in-process one.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use model_deployer::config::{ConfigLoader, RuntimeSettings};
use model_deployer::logging::init_structured_logging;
use model_deployer::orchestration::{DeploymentOrchestrator, DeploymentRequest};
use model_deployer::services::DeploymentServices;
use model_deployer::ModelArtifact;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "model-deployer")]
#[command(about = "Deploy trained model artifacts to managed prediction endpoints")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy using a deployment document, then register monitoring
    Deploy {
        /// Path to the YAML deployment document
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// Skip metric registration after the endpoint is live
        #[arg(long)]
        skip_monitoring: bool,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Deploy with explicit parameters
    DeployModel {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        bucket: String,

        /// Deployment target (vertex_ai or ray)
        #[arg(short, long, default_value = "vertex_ai")]
        target: String,

        /// Defaults to `model-<file name>-endpoint`
        #[arg(long)]
        endpoint_name: Option<String>,

        #[arg(long, default_value = "sklearn")]
        framework: String,

        #[arg(long, default_value = "1.0")]
        version: String,

        /// Extra package for a custom serving image, as `package==version`
        #[arg(long = "requirement", value_parser = parse_requirement)]
        requirements: Vec<(String, String)>,

        #[arg(long, env = "MODEL_DEPLOYER_PROJECT")]
        project: String,

        #[arg(long, env = "MODEL_DEPLOYER_REGION")]
        region: String,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Check that an artifact has a supported format
    Validate {
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Register the latency metric for an existing endpoint
    Monitor {
        #[arg(long, env = "MODEL_DEPLOYER_PROJECT")]
        project: String,

        /// Endpoint resource name
        #[arg(long)]
        endpoint: String,

        #[arg(long, env = "MODEL_DEPLOYER_REGION", default_value = "us-central1")]
        region: String,

        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
pub struct RunOptions {
    /// Use in-process services instead of the cloud APIs
    #[arg(long)]
    dry_run: bool,

    /// Delete the uploaded artifact and registered model if a later step fails
    #[arg(long)]
    rollback_on_failure: bool,
}

fn parse_requirement(raw: &str) -> Result<(String, String), String> {
    match raw.split_once("==") {
        Some((package, version)) if !package.trim().is_empty() && !version.trim().is_empty() => {
            Ok((package.trim().to_string(), version.trim().to_string()))
        }
        _ => Err(format!("expected package==version, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Held until main returns so the file writer flushes on both exit paths
    let _log_guard = init_structured_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Deploy {
            config,
            model,
            skip_monitoring,
            run,
        } => {
            let document = ConfigLoader::load(&config)?;
            let services = build_services(&document.project_id, &document.region, run.dry_run)?;

            let endpoint = orchestrator(&services, &run)
                .deploy_config(&document, &model)
                .await?;
            info!(endpoint = %endpoint, "Model deployed");

            if !skip_monitoring {
                services
                    .monitoring()
                    .setup_monitoring(&document.project_id, &endpoint)
                    .await?;
            }
            Ok(endpoint)
        }
        Commands::DeployModel {
            model,
            bucket,
            target,
            endpoint_name,
            framework,
            version,
            requirements,
            project,
            region,
            run,
        } => {
            let services = build_services(&project, &region, run.dry_run)?;

            let mut request =
                DeploymentRequest::new(model, bucket, target).with_framework(framework, version);
            if let Some(name) = endpoint_name {
                request = request.with_endpoint_name(name);
            }
            if !requirements.is_empty() {
                request = request
                    .with_requirements(requirements.into_iter().collect::<BTreeMap<_, _>>());
            }

            let endpoint = orchestrator(&services, &run).deploy(&request).await?;
            info!(endpoint = %endpoint, "Model deployed");
            Ok(endpoint)
        }
        Commands::Validate { model } => {
            let artifact = ModelArtifact::validate(&model)?;
            Ok(format!("{} ({})", artifact.path().display(), artifact.format()))
        }
        Commands::Monitor {
            project,
            endpoint,
            region,
            dry_run,
        } => {
            let services = build_services(&project, &region, dry_run)?;
            services
                .monitoring()
                .setup_monitoring(&project, &endpoint)
                .await?;
            Ok(endpoint)
        }
    }
}

fn build_services(
    project: &str,
    region: &str,
    dry_run: bool,
) -> anyhow::Result<DeploymentServices> {
    let settings = RuntimeSettings::from_env().context("reading runtime settings")?;

    if dry_run {
        info!(project_id = %project, region = %region, "Dry run: using in-process services");
        let (services, _fakes) = DeploymentServices::in_memory(project, region, settings);
        return Ok(services);
    }

    Ok(DeploymentServices::production(project, region, settings)?)
}

fn orchestrator(services: &DeploymentServices, run: &RunOptions) -> DeploymentOrchestrator {
    if run.rollback_on_failure {
        services.orchestrator_with_rollback()
    } else {
        services.orchestrator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_requirement() {
        assert_eq!(
            parse_requirement("pandas==1.5.0").unwrap(),
            ("pandas".to_string(), "1.5.0".to_string())
        );
        assert!(parse_requirement("pandas").is_err());
        assert!(parse_requirement("==1.0").is_err());
        assert!(parse_requirement("pandas==").is_err());
    }
}
