//! Concurrent detail lookups for the selected candidates.
//!
//! All lookups start together; results are reassembled in candidate order
//! regardless of which response arrives first. What a single failure does
//! to the batch depends on the `FanOutPolicy`.

use std::time::Duration;

use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use crate::outcome::{FailedCandidate, PipelineError, Stage};
use crate::timeout::bounded;
use domain::{CandidateItem, CatalogDetailClient, FanOutPolicy, FilmDetail};

/// Keep the first `k` hits in provider order
pub fn select_top_k<T>(mut hits: Vec<T>, k: usize) -> Vec<T> {
    hits.truncate(k);
    hits
}

/// Details fetched for one batch of candidates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailBatch {
    /// In candidate order
    pub details: Vec<FilmDetail>,
    /// Candidates whose lookup failed (partial policy only)
    pub failed: Vec<FailedCandidate>,
}

/// Look up every candidate concurrently.
///
/// # Returns
/// * `Ok(DetailBatch)` - details in the same order as `candidates`
/// * `Err` - under `AllOrNothing`, the first failure; under `Partial`,
///   only when every lookup failed
pub async fn fetch_details(
    client: &dyn CatalogDetailClient,
    candidates: &[CandidateItem],
    policy: FanOutPolicy,
    limit: Duration,
) -> Result<DetailBatch, PipelineError> {
    debug!("Fetching details for {} candidates ({:?})", candidates.len(), policy);

    let lookups = candidates.iter().map(|candidate| async move {
        bounded(limit, client.detail(candidate.id))
            .await
            .map(|detail| pin_identity(candidate, detail))
            .map_err(|e| PipelineError::at(Stage::FilmDetail, e))
    });

    match policy {
        FanOutPolicy::AllOrNothing => {
            let details = try_join_all(lookups).await?;
            Ok(DetailBatch {
                details,
                failed: Vec::new(),
            })
        }
        FanOutPolicy::Partial => {
            let settled = join_all(lookups).await;
            let mut batch = DetailBatch::default();

            for (candidate, result) in candidates.iter().zip(settled) {
                match result {
                    Ok(detail) => batch.details.push(detail),
                    Err(error) => {
                        warn!("Detail lookup for film {} failed: {}", candidate.id, error);
                        batch.failed.push(FailedCandidate {
                            id: candidate.id,
                            error,
                        });
                    }
                }
            }

            if batch.details.is_empty() && !batch.failed.is_empty() {
                return Err(batch.failed.swap_remove(0).error);
            }
            Ok(batch)
        }
    }
}

/// Results always carry the id of the candidate they were fetched for
fn pin_identity(candidate: &CandidateItem, mut detail: FilmDetail) -> FilmDetail {
    if detail.id != candidate.id {
        warn!(
            "Detail for film {} came back with id {}; keeping the candidate id",
            candidate.id, detail.id
        );
        detail.id = candidate.id;
    }
    detail
}
