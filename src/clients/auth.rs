use super::{ClientError, ClientResult};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// gcloud tokens live for an hour; refresh well before that
const TOKEN_REFRESH_AFTER: Duration = Duration::from_secs(45 * 60);

/// Where bearer tokens for the cloud APIs come from
#[derive(Clone)]
pub enum TokenSource {
    /// Fixed token, e.g. from `GOOGLE_OAUTH_ACCESS_TOKEN`
    Static(String),
    /// `gcloud auth print-access-token`, cached between calls
    Gcloud {
        cached: Arc<Mutex<Option<(String, Instant)>>>,
    },
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(_) => f.write_str("TokenSource::Static([MASKED])"),
            Self::Gcloud { .. } => f.write_str("TokenSource::Gcloud"),
        }
    }
}

impl TokenSource {
    pub fn from_env() -> Self {
        match std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => Self::Static(token),
            _ => Self::gcloud(),
        }
    }

    pub fn gcloud() -> Self {
        Self::Gcloud {
            cached: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn bearer(&self) -> ClientResult<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::Gcloud { cached } => {
                let fresh = cached
                    .lock()
                    .as_ref()
                    .filter(|(_, fetched_at)| fetched_at.elapsed() < TOKEN_REFRESH_AFTER)
                    .map(|(token, _)| token.clone());
                if let Some(token) = fresh {
                    return Ok(token);
                }

                let token = Self::fetch_gcloud_token().await?;
                *cached.lock() = Some((token.clone(), Instant::now()));
                Ok(token)
            }
        }
    }

    async fn fetch_gcloud_token() -> ClientResult<String> {
        debug!("Fetching access token from gcloud");
        let output = Command::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| ClientError::Auth(format!("Failed to run gcloud: {e}")))?;

        if !output.status.success() {
            return Err(ClientError::Auth(format!(
                "gcloud auth print-access-token failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(ClientError::Auth("gcloud returned an empty token".to_string()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let source = TokenSource::Static("ya29.token".to_string());
        assert_eq!(source.bearer().await.unwrap(), "ya29.token");
        assert_eq!(format!("{source:?}"), "TokenSource::Static([MASKED])");
    }
}
