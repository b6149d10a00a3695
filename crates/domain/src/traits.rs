//! Upstream capabilities the recommendation pipeline depends on.
//!
//! Each trait is object safe so the pipeline can hold `Arc<dyn ...>` and
//! tests can swap in scripted implementations.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::types::{CompletionRequest, FilmDetail, FilmId};

/// Sends a prompt to a hosted language model
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the free-text content of the first choice
    async fn complete(&self, request: &CompletionRequest) -> ClientResult<String>;
}

/// Free-text search against a media catalog.
///
/// Hits come back in provider relevance order.
#[async_trait]
pub trait CatalogSearchClient: Send + Sync {
    type Hit: Send;

    async fn search(&self, query: &str) -> ClientResult<Vec<Self::Hit>>;
}

/// Identifier lookup against the film catalog
#[async_trait]
pub trait CatalogDetailClient: Send + Sync {
    async fn detail(&self, id: FilmId) -> ClientResult<FilmDetail>;
}
