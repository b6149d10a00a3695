//! # Domain Crate
//!
//! Shared vocabulary for the mood recommendation workspace.
//!
//! ## Main Components
//!
//! - **types**: Transcript, keyword, candidate and result records
//! - **traits**: The upstream capabilities (completion, catalog search, catalog detail)
//! - **config**: Startup configuration loaded from the environment
//! - **error**: Client and configuration errors
//!
//! ## Example Usage
//!
//! ```ignore
//! use domain::AppConfig;
//!
//! // Fails fast when a credential is missing
//! let config = AppConfig::from_env()?;
//! println!("K = {}", config.top_k);
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{ApiKey, AppConfig, CompletionConfig, FilmCatalogConfig, MusicCatalogConfig};
pub use error::{ClientError, ClientResult, ConfigError};
pub use traits::{CatalogDetailClient, CatalogSearchClient, CompletionClient};
pub use types::{
    // Type aliases
    FilmId,
    TrackId,
    // Conversation
    Message,
    Role,
    Transcript,
    CompletionRequest,
    // Recommendation records
    Mood,
    Keyword,
    CandidateItem,
    FilmDetail,
    FilmResult,
    TrackHit,
    TrackResult,
    // Tuning
    FanOutPolicy,
    PromptStyle,
};
