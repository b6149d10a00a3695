//! Shared request helper for the catalog sources.
//!
//! Sends a prepared request and classifies the outcome the same way for
//! every catalog: network failure, non-success status, or a body that
//! does not match the expected shape.

use domain::{ClientError, ClientResult};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Longest slice of a response body kept in an error message
const BODY_EXCERPT_CHARS: usize = 500;

/// Send `request` and decode a JSON body of type `T`
pub(crate) async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, what: &str) -> ClientResult<T> {
    let response = request.send().await.map_err(|e| {
        warn!("{} request failed: {}", what, e);
        ClientError::Transport(e.to_string())
    })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    if !status.is_success() {
        warn!("{} returned HTTP {}", what, status);
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: excerpt(&text),
        });
    }

    serde_json::from_str(&text)
        .map_err(|e| ClientError::Decode(format!("{}: {} in body: {}", what, e, excerpt(&text))))
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}
