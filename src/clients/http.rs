use super::{ClientError, ClientResult};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Shared HTTP client construction for the REST backed services
pub fn build_http_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("model-deployer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::from)
}

/// Map non-success responses onto [`ClientError`] variants
pub async fn check_response(response: Response, resource: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(resource.to_string()),
        StatusCode::CONFLICT => ClientError::Conflict(resource.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ClientError::Auth(format!("{status} on {resource}: {}", truncate(&body)))
        }
        _ => ClientError::api(status.as_u16(), format!("{resource}: {}", truncate(&body))),
    })
}

fn truncate(body: &str) -> &str {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_bodies() {
        assert_eq!(truncate("bucket exists"), "bucket exists");
        let long = "x".repeat(2000);
        assert_eq!(truncate(&long).len(), 512);
    }
}
