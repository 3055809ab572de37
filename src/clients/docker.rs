use super::{ClientError, ClientResult, ContainerEngine};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

/// [`ContainerEngine`] backed by the docker (or podman) command line
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> ClientResult<()> {
        let command_line = format!("{} {}", self.binary, args.join(" "));
        debug!(command = %command_line, "Running container engine command");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| ClientError::process(&command_line, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(ClientError::process(
                command_line,
                format!("exit status {}: {}", output.status, tail.join("\n")),
            ));
        }

        Ok(())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerEngine for DockerCli {
    async fn build(&self, context_dir: &Path, tag: &str) -> ClientResult<()> {
        let context = context_dir.to_string_lossy();
        info!(tag = %tag, context = %context, "Building image");
        self.run(&["build", "--rm", "-t", tag, context.as_ref()]).await
    }

    async fn push(&self, tag: &str) -> ClientResult<()> {
        info!(tag = %tag, "Pushing image");
        self.run(&["push", tag]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_process_error() {
        let engine = DockerCli::new("definitely-not-a-container-engine");
        let err = engine.push("gcr.io/p1/vertex-ai-model:1.0").await.unwrap_err();
        assert!(matches!(err, ClientError::Process { .. }));
    }
}
