//! Completion client for the hosted language-model endpoint.
//!
//! This crate provides a Rust client for an OpenAI-compatible
//! `chat/completions` API. It handles:
//! - Bearer authentication with a static key
//! - Converting domain messages to the wire request
//! - Extracting the first choice's content
//! - Classifying failures as transport, status or decode errors

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use domain::{ApiKey, ClientError, ClientResult, CompletionClient, CompletionConfig, CompletionRequest, Message};

/// Longest slice of an error body kept in an error message
const BODY_EXCERPT_CHARS: usize = 500;

/// Request body of the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

/// Response body of the chat completions endpoint
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Client for the chat completions service.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: ApiKey,
    endpoint: String,
}

impl OpenAiClient {
    /// Create a client for `base_url` (e.g. "https://api.openai.com/v1")
    pub fn new(api_key: ApiKey, base_url: impl AsRef<str>) -> Self {
        Self::with_client(Client::new(), api_key, base_url)
    }

    /// Create a client that reuses an existing `reqwest::Client`
    pub fn with_client(client: Client, api_key: ApiKey, base_url: impl AsRef<str>) -> Self {
        let endpoint = format!("{}/chat/completions", base_url.as_ref().trim_end_matches('/'));
        Self {
            client,
            api_key,
            endpoint,
        }
    }

    /// Build a client from the completion section of the app config
    pub fn from_config(config: &CompletionConfig) -> Self {
        Self::new(config.api_key.clone(), &config.base_url)
    }

    /// Full URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> ClientResult<String> {
        debug!(
            "Calling model {} (messages: {}, max_tokens: {}, temperature: {})",
            request.model,
            request.messages.len(),
            request.max_tokens,
            request.temperature
        );

        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                ClientError::Transport(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            error!("Completion endpoint returned HTTP {}", status);
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        parse_completion(&text)
    }
}

/// Pull the first choice's content out of a raw response body
fn parse_completion(text: &str) -> ClientResult<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(text)
        .map_err(|e| ClientError::Decode(format!("{} in body: {}", e, excerpt(text))))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::Decode("response contained no choices".into()))?;

    choice
        .message
        .content
        .ok_or_else(|| ClientError::Decode("first choice has no message content".into()))
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}
