//! # Sources Crate
//!
//! HTTP implementations of the catalog capabilities used by the
//! recommendation pipeline.
//!
//! ## Components
//!
//! ### TMDB Source (Film)
//! - Free-text film search with a fixed region and language
//! - Detail lookup with credits appended (genres, cast, rating, poster)
//!
//! ### Deezer Source (Music)
//! - Free-text track search; each hit is already display-complete
//!
//! ## Example Usage
//!
//! ```ignore
//! use domain::{AppConfig, CatalogDetailClient, CatalogSearchClient};
//! use sources::{DeezerSource, TmdbSource};
//!
//! let config = AppConfig::from_env()?;
//! let films = TmdbSource::from_config(&config.film);
//! let music = DeezerSource::from_config(&config.music);
//!
//! let candidates = films.search("comfort").await?;
//! let detail = films.detail(candidates[0].id).await?;
//! let tracks = music.search("comfort").await?;
//! ```

mod http;
pub mod deezer;
pub mod tmdb;

// Re-export commonly used types
pub use deezer::DeezerSource;
pub use tmdb::TmdbSource;
