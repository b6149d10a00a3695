//! Request generations for last-request-wins ordering.
//!
//! Every new request takes the next number from a shared counter. A request
//! may publish its outcome only while its number is still the latest one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing request counter
#[derive(Debug, Clone, Default)]
pub struct Generation {
    latest: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request, making every earlier token stale
    pub fn begin(&self) -> RequestToken {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestToken {
            id,
            latest: Some(self.latest.clone()),
        }
    }

    /// Number of the most recently started request (0 before the first)
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

/// Identity of one request within its `Generation`
#[derive(Debug, Clone)]
pub struct RequestToken {
    id: u64,
    latest: Option<Arc<AtomicU64>>,
}

impl RequestToken {
    /// A token that never goes stale, for callers without a session
    pub fn detached() -> Self {
        Self { id: 0, latest: None }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether no newer request has started since this one
    pub fn is_current(&self) -> bool {
        self.latest
            .as_ref()
            .is_none_or(|latest| latest.load(Ordering::SeqCst) == self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_request_makes_older_stale() {
        let generation = Generation::new();
        assert_eq!(generation.latest(), 0);

        let first = generation.begin();
        assert!(first.is_current());

        let second = generation.begin();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
        assert_eq!(generation.latest(), second.id());
    }

    #[test]
    fn test_detached_token_is_always_current() {
        let generation = Generation::new();
        let detached = RequestToken::detached();
        generation.begin();
        assert!(detached.is_current());
    }
}
