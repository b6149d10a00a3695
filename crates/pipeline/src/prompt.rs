//! Prompt construction for the keyword request.
//!
//! The prompt asks for one bare keyword (or one bare title). The model is
//! free to ignore that, so the reply still goes through `keyword::parse_keyword`.

use domain::{CompletionConfig, CompletionRequest, Message, PromptStyle};

/// Model parameters for the keyword request
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub style: PromptStyle,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            model: domain::config::DEFAULT_MODEL.to_string(),
            max_tokens: 15,
            temperature: 0.7,
            style: PromptStyle::Keyword,
        }
    }
}

impl From<&CompletionConfig> for PromptSettings {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            style: config.prompt_style,
        }
    }
}

/// Render the fixed instruction for a mood
pub fn instruction(mood: &str, style: PromptStyle) -> String {
    match style {
        PromptStyle::Keyword => format!(
            "A user describes how they feel: \"{}\". \
             Reply with exactly one English keyword that captures a film theme suited to this mood. \
             Reply with the keyword only, without quotes, punctuation or explanation.",
            mood
        ),
        PromptStyle::Title => format!(
            "A user describes how they feel: \"{}\". \
             Recommend exactly one film for this mood. \
             Reply with the film's original title only, without quotes, year or explanation.",
            mood
        ),
    }
}

/// Build the completion request for one mood
pub fn build_keyword_request(mood: &str, settings: &PromptSettings) -> CompletionRequest {
    CompletionRequest {
        model: settings.model.clone(),
        messages: vec![Message::user(instruction(mood, settings.style))],
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    }
}
