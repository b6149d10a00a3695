//! Result and error shapes of one pipeline run.

use std::fmt;

use domain::{ClientError, FilmId, FilmResult, Keyword, TrackResult};
use thiserror::Error;

/// Where in the pipeline a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Completion,
    FilmSearch,
    FilmDetail,
    MusicSearch,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Completion => "completion",
            Stage::FilmSearch => "film_search",
            Stage::FilmDetail => "film_detail",
            Stage::MusicSearch => "music_search",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a pipeline run (or of one of its branches)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Network or HTTP failure, including timeouts
    #[error("{stage} failed: {cause}")]
    Transport { stage: Stage, cause: ClientError },

    /// An upstream answered with an unexpected shape
    #[error("{stage} returned an unexpected response: {cause}")]
    Decode { stage: Stage, cause: ClientError },

    /// A newer request started; this one stopped before `stage`
    #[error("superseded by a newer request before {stage}")]
    Superseded { stage: Stage },
}

impl PipelineError {
    /// Attach a stage to a client failure
    pub fn at(stage: Stage, cause: ClientError) -> Self {
        if cause.is_decode() {
            PipelineError::Decode { stage, cause }
        } else {
            PipelineError::Transport { stage, cause }
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Transport { stage, .. }
            | PipelineError::Decode { stage, .. }
            | PipelineError::Superseded { stage } => *stage,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, PipelineError::Decode { .. })
    }

    /// Apologetic status line for the person at the keyboard
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Transport { stage, .. } => format!(
                "Sorry, we could not reach the {} service. Please try again in a moment.",
                service_name(*stage)
            ),
            PipelineError::Decode { stage, .. } => format!(
                "Sorry, the {} service sent a reply we could not understand. Please try again.",
                service_name(*stage)
            ),
            PipelineError::Superseded { .. } => "Replaced by a newer request.".to_string(),
        }
    }
}

fn service_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Completion => "recommendation",
        Stage::FilmSearch | Stage::FilmDetail => "movie",
        Stage::MusicSearch => "music",
    }
}

/// A candidate whose detail lookup failed under the partial fan-out policy
#[derive(Debug, Clone, PartialEq)]
pub struct FailedCandidate {
    pub id: FilmId,
    pub error: PipelineError,
}

/// What one branch (film or music) produced
#[derive(Debug, Clone, PartialEq)]
pub enum BranchOutcome<T> {
    /// Results in search order; `failed` is only ever non-empty under the
    /// partial fan-out policy
    Found {
        items: Vec<T>,
        failed: Vec<FailedCandidate>,
    },
    /// The search returned no candidates
    NoMatch,
    Failed(PipelineError),
}

impl<T> BranchOutcome<T> {
    pub fn found(items: Vec<T>) -> Self {
        BranchOutcome::Found {
            items,
            failed: Vec::new(),
        }
    }

    /// Results of this branch, empty unless `Found`
    pub fn items(&self) -> &[T] {
        match self {
            BranchOutcome::Found { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, BranchOutcome::NoMatch)
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            BranchOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Everything one successful run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub keyword: Keyword,
    pub films: BranchOutcome<FilmResult>,
    /// `None` when the music branch is disabled
    pub music: Option<BranchOutcome<TrackResult>>,
}

impl PipelineResult {
    /// True when every branch that ran came back empty
    pub fn is_no_match(&self) -> bool {
        self.films.is_no_match() && self.music.as_ref().is_none_or(BranchOutcome::is_no_match)
    }

    pub fn tracks(&self) -> &[TrackResult] {
        self.music.as_ref().map(BranchOutcome::items).unwrap_or(&[])
    }
}
