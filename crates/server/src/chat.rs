//! Free-form chat with the completion model.
//!
//! The whole transcript goes out with every turn. Failures are recorded in
//! the transcript as system messages and are never sent back to the model.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use domain::{CompletionClient, CompletionConfig, CompletionRequest, Message, Role, Transcript};
use pipeline::bounded;

/// Reply budget of a chat turn
pub const CHAT_MAX_TOKENS: u32 = 100;

pub struct ChatSession {
    client: Arc<dyn CompletionClient>,
    transcript: Transcript,
    model: String,
    max_tokens: u32,
    temperature: f32,
    call_timeout: Duration,
}

impl ChatSession {
    pub fn new(client: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            transcript: Transcript::new(),
            model: model.into(),
            max_tokens: CHAT_MAX_TOKENS,
            temperature: 0.7,
            call_timeout: Duration::from_secs(10),
        }
    }

    /// Use the model and temperature of the completion config
    pub fn from_config(client: Arc<dyn CompletionClient>, config: &CompletionConfig) -> Self {
        Self::new(client, config.model.clone()).with_temperature(config.temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Start over with an empty transcript
    pub fn clear(&mut self) {
        self.transcript.clear();
    }

    /// Send one user turn.
    ///
    /// Returns the message appended for this turn (the assistant reply, or a
    /// system message describing the failure), or `None` for blank input.
    pub async fn send(&mut self, text: &str) -> Option<&Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.transcript.push(Message::user(text));
        let request = self.request();

        match bounded(self.call_timeout, self.client.complete(&request)).await {
            Ok(reply) => {
                info!("Chat reply received ({} messages in transcript)", self.transcript.len() + 1);
                self.transcript.push(Message::assistant(reply.trim()));
            }
            Err(e) => {
                warn!("Chat turn failed: {}", e);
                // Shown to the user only; `request()` leaves system messages out
                self.transcript.push(Message::system(format!("Error: {}", e)));
            }
        }
        self.transcript.last()
    }

    fn request(&self) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            messages: self
                .transcript
                .messages()
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned()
                .collect(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}
