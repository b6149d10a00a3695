//! Core domain types shared by the clients, the pipeline and the front end.
//!
//! Everything here is request-scoped: a value is created when a request
//! starts and replaced wholesale by the next one.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Identifier of a film in the film catalog
pub type FilmId = u64;

/// Identifier of a track in the music catalog
pub type TrackId = u64;

// =============================================================================
// Conversation Types
// =============================================================================

/// Who authored a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message sent to (or received from) the completion endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Append-only conversation log owned by a chat session.
///
/// Messages can only be pushed; the whole log can be cleared, which is
/// what a page reload does.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Parameters of one completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

// =============================================================================
// Recommendation Types
// =============================================================================

/// Trimmed, non-empty user input describing how they feel.
///
/// Blank input never becomes a `Mood`, so the pipeline cannot be started
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mood(String);

impl Mood {
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The search term derived from one completion.
///
/// Always a single non-empty line; construct it through the pipeline's
/// keyword parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct Keyword(String);

impl Keyword {
    /// Wrap an already-normalized keyword. Returns `None` when the text is
    /// empty or spans several lines.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() || text.contains(['\n', '\r']) {
            return None;
        }
        Some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Keyword {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Keyword::new(text).ok_or_else(|| "keyword must be a single non-empty line".to_string())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lightweight search hit from the film catalog, before enrichment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: FilmId,
    pub title: String,
    /// Provider relevance signal (popularity for the film catalog)
    pub raw_score: f32,
}

impl CandidateItem {
    pub fn new(id: FilmId, title: impl Into<String>, raw_score: f32) -> Self {
        Self {
            id,
            title: title.into(),
            raw_score,
        }
    }
}

/// Film metadata as returned by a detail lookup, not yet shaped for display
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilmDetail {
    pub id: FilmId,
    pub title: String,
    /// Path relative to the catalog's image base
    pub poster_path: Option<String>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub vote_average: f32,
    pub overview: Option<String>,
    pub release_date: Option<String>,
}

/// A track hit from the music catalog. The music search already carries
/// everything needed for display, so there is no separate detail step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackHit {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub cover_url: Option<String>,
    pub preview_url: Option<String>,
}

/// Display-ready film record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmResult {
    pub id: FilmId,
    pub title: String,
    pub poster_url: Option<String>,
    /// At most three genre names, in catalog order
    pub genres: Vec<String>,
    /// At most three cast names, in billing order
    pub cast: Vec<String>,
    pub rating: f32,
    pub overview: Option<String>,
    pub release_date: Option<String>,
}

impl FilmResult {
    /// Genres joined for display, e.g. "Drama, Comedy"
    pub fn genres_line(&self) -> String {
        self.genres.join(", ")
    }

    /// Cast joined for display, e.g. "A, B, C"
    pub fn cast_line(&self) -> String {
        self.cast.join(", ")
    }
}

/// Display-ready track record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackResult {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub cover_url: Option<String>,
    pub preview_url: Option<String>,
}

// =============================================================================
// Tuning Enums
// =============================================================================

/// What the completion prompt asks the model to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptStyle {
    /// A single bare keyword describing a theme
    #[default]
    Keyword,
    /// A single bare film title
    Title,
}

/// How a failed detail lookup affects its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOutPolicy {
    /// One failure fails the whole batch
    #[default]
    AllOrNothing,
    /// Keep the items that succeeded and report the ones that failed
    Partial,
}
