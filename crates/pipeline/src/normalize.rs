//! Shaping detail payloads into display records.
//!
//! Film details carry full genre and cast lists plus a poster path that is
//! relative to the catalog's image host. Display records keep the first
//! few names of each list and an absolute poster URL.

use domain::{FilmDetail, FilmResult, TrackHit, TrackResult};

/// Number of genre and cast names kept for display
pub const DISPLAY_NAMES: usize = 3;

/// Converts catalog payloads into display records.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    image_base_url: String,
    display_names: usize,
}

impl ResultNormalizer {
    /// Create a normalizer that resolves poster paths against `image_base_url`
    pub fn new(image_base_url: impl Into<String>) -> Self {
        Self {
            image_base_url: image_base_url.into().trim_end_matches('/').to_string(),
            display_names: DISPLAY_NAMES,
        }
    }

    /// Configure how many genre/cast names are kept (default: 3)
    pub fn with_display_names(mut self, count: usize) -> Self {
        self.display_names = count;
        self
    }

    /// Shape one film detail. Name order is preserved.
    pub fn film(&self, detail: FilmDetail) -> FilmResult {
        FilmResult {
            id: detail.id,
            poster_url: self.poster_url(detail.poster_path.as_deref()),
            genres: truncated(detail.genres, self.display_names),
            cast: truncated(detail.cast, self.display_names),
            title: detail.title,
            rating: detail.vote_average,
            overview: detail.overview,
            release_date: detail.release_date,
        }
    }

    /// Shape one track hit. Blank URLs become `None`.
    pub fn track(&self, hit: TrackHit) -> TrackResult {
        TrackResult {
            id: hit.id,
            title: hit.title,
            artist: hit.artist,
            cover_url: non_blank(hit.cover_url),
            preview_url: non_blank(hit.preview_url),
        }
    }

    fn poster_url(&self, path: Option<&str>) -> Option<String> {
        let path = path.map(str::trim).filter(|p| !p.is_empty())?;
        if path.starts_with('/') {
            Some(format!("{}{}", self.image_base_url, path))
        } else {
            Some(format!("{}/{}", self.image_base_url, path))
        }
    }
}

fn truncated(mut names: Vec<String>, limit: usize) -> Vec<String> {
    names.truncate(limit);
    names
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
