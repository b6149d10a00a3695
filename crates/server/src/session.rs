//! Recommendation session: one display slot, last request wins.
//!
//! Requests may overlap. Each one takes a token from the session's
//! `Generation` and only publishes into the display slot while its token is
//! still current, so a slow early request can never overwrite the answer to
//! a later one.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::generation::{Generation, RequestToken};
use crate::orchestrator::RecommendationOrchestrator;
use domain::{Keyword, Mood};
use pipeline::{PipelineError, PipelineResult};

/// What the display slot currently shows
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DisplayState {
    #[default]
    Idle,
    Loading {
        request: u64,
    },
    Ready {
        request: u64,
        result: PipelineResult,
    },
    NoMatch {
        request: u64,
        keyword: Keyword,
    },
    Failed {
        request: u64,
        status: String,
    },
}

impl DisplayState {
    /// Request this state belongs to (`None` while idle)
    pub fn request(&self) -> Option<u64> {
        match self {
            DisplayState::Idle => None,
            DisplayState::Loading { request }
            | DisplayState::Ready { request, .. }
            | DisplayState::NoMatch { request, .. }
            | DisplayState::Failed { request, .. } => Some(*request),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DisplayState::Loading { .. })
    }

    fn settled(request: u64, outcome: Result<PipelineResult, PipelineError>) -> Self {
        match outcome {
            Ok(result) if result.is_no_match() => DisplayState::NoMatch {
                request,
                keyword: result.keyword,
            },
            Ok(result) => DisplayState::Ready { request, result },
            Err(error) => DisplayState::Failed {
                request,
                status: error.user_message(),
            },
        }
    }
}

pub struct RecommendationSession {
    orchestrator: Arc<RecommendationOrchestrator>,
    generation: Generation,
    display: watch::Sender<DisplayState>,
}

impl RecommendationSession {
    pub fn new(orchestrator: Arc<RecommendationOrchestrator>) -> Self {
        let (display, _) = watch::channel(DisplayState::Idle);
        Self {
            orchestrator,
            generation: Generation::new(),
            display,
        }
    }

    /// Observe every change of the display slot
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    pub fn current(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Submit a mood and publish the outcome if no newer request started.
    ///
    /// # Returns
    /// * `Some(state)` - the state this request published
    /// * `None` - blank input (nothing happened) or the request was superseded
    pub async fn submit(&self, text: &str) -> Option<DisplayState> {
        let mood = Mood::new(text)?;

        // Taking the token and showing Loading happen under the slot's lock,
        // so a stale request cannot publish between the two.
        let mut token = RequestToken::detached();
        self.display.send_modify(|state| {
            token = self.generation.begin();
            *state = DisplayState::Loading { request: token.id() };
        });
        info!("Request {} started for mood {:?}", token.id(), mood.as_str());

        let outcome = self.orchestrator.run_as(&mood, &token).await;
        if let Err(PipelineError::Superseded { stage }) = &outcome {
            debug!("Request {} stopped before {}", token.id(), stage);
            return None;
        }

        let next = DisplayState::settled(token.id(), outcome);
        let published = self.display.send_if_modified(|state| {
            if token.is_current() {
                *state = next.clone();
                true
            } else {
                false
            }
        });

        if published {
            Some(next)
        } else {
            debug!("Discarding result of superseded request {}", token.id());
            None
        }
    }
}
