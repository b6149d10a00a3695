//! Deezer Source - Music catalog search
//!
//! A single `GET /search?q=` already carries title, artist, cover art and
//! the preview clip, so this source only implements search.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::fetch_json;
use domain::{ApiKey, CatalogSearchClient, ClientResult, MusicCatalogConfig, TrackHit, TrackId};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<TrackRecord>,
}

#[derive(Debug, Deserialize)]
struct TrackRecord {
    id: TrackId,
    title: String,
    artist: Artist,
    album: Album,
    #[serde(default)]
    preview: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Artist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    cover_medium: Option<String>,
}

impl From<TrackRecord> for TrackHit {
    fn from(raw: TrackRecord) -> Self {
        TrackHit {
            id: raw.id,
            title: raw.title,
            artist: raw.artist.name,
            cover_url: raw.album.cover_medium,
            preview_url: raw.preview,
        }
    }
}

/// Deezer source performs track search
#[derive(Clone)]
pub struct DeezerSource {
    client: Client,
    /// Sent as a bearer credential when present
    api_key: Option<ApiKey>,
    base_url: String,
}

impl DeezerSource {
    /// Create a new Deezer source for `base_url` (e.g. "https://api.deezer.com")
    pub fn new(base_url: impl AsRef<str>, api_key: Option<ApiKey>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        }
    }

    /// Build a source from the music section of the app config
    pub fn from_config(config: &MusicCatalogConfig) -> Self {
        Self::new(&config.base_url, config.api_key.clone())
    }
}

#[async_trait]
impl CatalogSearchClient for DeezerSource {
    type Hit = TrackHit;

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> ClientResult<Vec<TrackHit>> {
        let mut request = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query)]);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose());
        }

        // Deezer reports quota and auth problems as 200 with an `error` object,
        // which fails to decode because `data` is missing.
        let response: SearchResponse = fetch_json(request, "music search").await?;
        debug!("Music search returned {} tracks", response.data.len());

        Ok(response.data.into_iter().map(TrackHit::from).collect())
    }
}
