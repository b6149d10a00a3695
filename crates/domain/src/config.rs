//! Startup configuration.
//!
//! Credentials and tuning knobs are read once from the environment,
//! validated, and then passed explicitly to the clients and the pipeline.
//! Nothing reads the environment after startup.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{FanOutPolicy, PromptStyle};

pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_FILM_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const DEFAULT_MUSIC_BASE_URL: &str = "https://api.deezer.com";

/// Upper bound for K; the catalog returns 20 hits per page
pub const MAX_TOP_K: usize = 10;

/// A credential that never shows up in `Debug` output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings for the language-model endpoint
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub model: String,
    /// Token ceiling for the keyword request
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt_style: PromptStyle,
}

/// Settings for the film catalog
#[derive(Debug, Clone)]
pub struct FilmCatalogConfig {
    pub api_key: ApiKey,
    pub base_url: String,
    pub image_base_url: String,
    pub region: String,
    pub language: String,
}

/// Settings for the music catalog
#[derive(Debug, Clone)]
pub struct MusicCatalogConfig {
    pub enabled: bool,
    /// Only sent when present; the public catalog needs none
    pub api_key: Option<ApiKey>,
    pub base_url: String,
}

/// Everything the application needs at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub completion: CompletionConfig,
    pub film: FilmCatalogConfig,
    pub music: MusicCatalogConfig,
    /// Number of film candidates enriched per request
    pub top_k: usize,
    pub fan_out: FanOutPolicy,
    /// Upper bound for each individual upstream call
    pub request_timeout: Duration,
}

impl AppConfig {
    /// Load and validate configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load and validate configuration through an arbitrary lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let or = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let completion = CompletionConfig {
            api_key: ApiKey::new(get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?),
            base_url: or("OPENAI_BASE_URL", DEFAULT_COMPLETION_BASE_URL),
            model: or("OPENAI_MODEL", DEFAULT_MODEL),
            max_tokens: parse_or("OPENAI_MAX_TOKENS", get("OPENAI_MAX_TOKENS"), 15)?,
            temperature: parse_or("OPENAI_TEMPERATURE", get("OPENAI_TEMPERATURE"), 0.7)?,
            prompt_style: match get("RECS_PROMPT_STYLE").as_deref() {
                None | Some("keyword") => PromptStyle::Keyword,
                Some("title") => PromptStyle::Title,
                Some(other) => {
                    return Err(invalid("RECS_PROMPT_STYLE", other, "expected keyword or title"));
                }
            },
        };

        let film = FilmCatalogConfig {
            api_key: ApiKey::new(get("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?),
            base_url: or("TMDB_BASE_URL", DEFAULT_FILM_BASE_URL),
            image_base_url: or("TMDB_IMAGE_BASE_URL", DEFAULT_IMAGE_BASE_URL),
            region: or("TMDB_REGION", "KR"),
            language: or("TMDB_LANGUAGE", "ko-KR"),
        };

        let music = MusicCatalogConfig {
            enabled: parse_flag("RECS_MUSIC", get("RECS_MUSIC"), true)?,
            api_key: get("MUSIC_API_KEY").map(ApiKey::new),
            base_url: or("MUSIC_BASE_URL", DEFAULT_MUSIC_BASE_URL),
        };

        let fan_out = match get("RECS_FAN_OUT").as_deref() {
            None | Some("all-or-nothing") => FanOutPolicy::AllOrNothing,
            Some("partial") => FanOutPolicy::Partial,
            Some(other) => {
                return Err(invalid("RECS_FAN_OUT", other, "expected all-or-nothing or partial"));
            }
        };

        let config = Self {
            completion,
            film,
            music,
            top_k: parse_or("RECS_TOP_K", get("RECS_TOP_K"), 3)?,
            fan_out,
            request_timeout: Duration::from_secs(parse_or(
                "RECS_TIMEOUT_SECS",
                get("RECS_TIMEOUT_SECS"),
                10u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check ranges that parsing alone cannot enforce
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.completion.api_key.expose().trim().is_empty() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }
        if self.film.api_key.expose().trim().is_empty() {
            return Err(ConfigError::Missing("TMDB_API_KEY"));
        }
        if self.top_k == 0 || self.top_k > MAX_TOP_K {
            return Err(invalid(
                "RECS_TOP_K",
                &self.top_k.to_string(),
                &format!("must be between 1 and {}", MAX_TOP_K),
            ));
        }
        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(invalid(
                "OPENAI_TEMPERATURE",
                &self.completion.temperature.to_string(),
                "must be between 0.0 and 2.0",
            ));
        }
        if self.completion.max_tokens == 0 {
            return Err(invalid("OPENAI_MAX_TOKENS", "0", "must be positive"));
        }
        if self.request_timeout.is_zero() {
            return Err(invalid("RECS_TIMEOUT_SECS", "0", "must be positive"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| invalid(name, &raw, &e.to_string())),
    }
}

fn parse_flag(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "on" | "yes") => Ok(true),
        Some("0" | "false" | "off" | "no") => Ok(false),
        Some(_) => Err(invalid(name, raw.as_deref().unwrap_or_default(), "expected a boolean")),
    }
}
