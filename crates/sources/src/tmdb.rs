//! TMDB Source - Film catalog search and detail lookups
//!
//! ## Endpoints
//! - `GET /search/movie?query=&region=&language=` → ranked candidates
//! - `GET /movie/{id}?append_to_response=credits` → genres, cast, rating
//!
//! Wire records are private to this module; callers only ever see
//! `CandidateItem` and `FilmDetail`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::http::fetch_json;
use domain::{
    ApiKey, CandidateItem, CatalogDetailClient, CatalogSearchClient, ClientResult, FilmCatalogConfig,
    FilmDetail, FilmId,
};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: FilmId,
    title: String,
    #[serde(default)]
    popularity: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: FilmId,
    title: String,
    poster_path: Option<String>,
    genres: Vec<Named>,
    credits: Credits,
    vote_average: f32,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Credits {
    cast: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

impl From<DetailResponse> for FilmDetail {
    fn from(raw: DetailResponse) -> Self {
        FilmDetail {
            id: raw.id,
            title: raw.title,
            poster_path: raw.poster_path,
            genres: raw.genres.into_iter().map(|g| g.name).collect(),
            cast: raw.credits.cast.into_iter().map(|c| c.name).collect(),
            vote_average: raw.vote_average,
            overview: raw.overview.filter(|o| !o.is_empty()),
            release_date: raw.release_date.filter(|d| !d.is_empty()),
        }
    }
}

/// TMDB source performs film search and detail enrichment
#[derive(Clone)]
pub struct TmdbSource {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    /// Regional constraint applied to every search
    region: String,
    /// Response language
    language: String,
}

impl TmdbSource {
    /// Create a new TMDB source
    ///
    /// ## Parameters
    /// - `api_key`: Read-access token sent as a bearer credential
    /// - `base_url`: API root, e.g. "https://api.themoviedb.org/3"
    pub fn new(api_key: ApiKey, base_url: impl AsRef<str>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            region: "KR".to_string(),
            language: "ko-KR".to_string(),
        }
    }

    /// Build a source from the film section of the app config
    pub fn from_config(config: &FilmCatalogConfig) -> Self {
        Self::new(config.api_key.clone(), &config.base_url)
            .with_region(&config.region)
            .with_language(&config.language)
    }

    /// Configure the search region (default: KR)
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Configure the response language (default: ko-KR)
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[async_trait]
impl CatalogSearchClient for TmdbSource {
    type Hit = CandidateItem;

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> ClientResult<Vec<CandidateItem>> {
        let request = self
            .client
            .get(format!("{}/search/movie", self.base_url))
            .bearer_auth(self.api_key.expose())
            .query(&[
                ("query", query),
                ("region", self.region.as_str()),
                ("language", self.language.as_str()),
            ]);

        let response: SearchResponse = fetch_json(request, "film search").await?;
        debug!("Film search returned {} hits", response.results.len());

        Ok(response
            .results
            .into_iter()
            .map(|hit| CandidateItem::new(hit.id, hit.title, hit.popularity.unwrap_or(0.0)))
            .collect())
    }
}

#[async_trait]
impl CatalogDetailClient for TmdbSource {
    #[instrument(skip(self))]
    async fn detail(&self, id: FilmId) -> ClientResult<FilmDetail> {
        let request = self
            .client
            .get(format!("{}/movie/{}", self.base_url, id))
            .bearer_auth(self.api_key.expose())
            .query(&[
                ("append_to_response", "credits"),
                ("language", self.language.as_str()),
            ]);

        let response: DetailResponse = fetch_json(request, "film detail").await?;
        Ok(response.into())
    }
}
