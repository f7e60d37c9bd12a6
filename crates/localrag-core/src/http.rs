//! JSON-over-HTTP plumbing shared by the embedding and LLM clients.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::Error;

pub use reqwest::Client;

pub fn client(timeout: Duration) -> anyhow::Result<Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

/// Map a transport failure to the crate error kinds callers match on.
pub fn transport_error(backend: &str, url: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("{backend} request to {url}"))
    } else if err.is_connect() {
        Error::BackendUnavailable { backend: backend.to_string(), detail: format!("{url}: {err}") }
    } else {
        Error::Backend(format!("{backend} request to {url} failed: {err}"))
    }
}

/// POST `body` as JSON and return the decoded JSON response.
pub async fn post_json(
    client: &Client,
    backend: &str,
    url: &str,
    body: &Value,
    bearer: Option<&str>,
) -> anyhow::Result<Value> {
    let mut req = client.post(url).header("Content-Type", "application/json").json(body);
    if let Some(token) = bearer {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    let resp = req.send().await.map_err(|e| transport_error(backend, url, &e))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::InvalidConfig(format!("{backend} rejected the credential ({status}): {text}"))
            }
            StatusCode::NOT_FOUND => Error::NotFound(format!("{backend} endpoint {url}: {text}")),
            _ => Error::Backend(format!("{backend} API error {status}: {text}")),
        }
        .into());
    }

    resp.json::<Value>()
        .await
        .map_err(|e| Error::Backend(format!("{backend} returned an unreadable response: {e}")).into())
}
