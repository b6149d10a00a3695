//! Building blocks of the mood recommendation pipeline.
//!
//! This crate provides:
//! - Prompt construction for the keyword request
//! - Defensive parsing of the completion into a keyword
//! - Top-K selection and concurrent detail fan-out
//! - Normalization of catalog payloads into display records
//! - The result and error shapes of a pipeline run
//!
//! ## Architecture
//! A run moves through the stages strictly in order:
//! 1. `prompt` builds the completion request from the mood
//! 2. `keyword` turns the completion into a single search term
//! 3. the catalog search returns ranked candidates; `fan_out` keeps the top K
//!    and looks their details up concurrently
//! 4. `normalize` shapes details into display records
//!
//! The orchestration itself lives in the `server` crate.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{build_keyword_request, parse_keyword, select_top_k, fetch_details};
//!
//! let request = build_keyword_request("행복", &PromptSettings::default());
//! let keyword = parse_keyword(&completion.complete(&request).await?)?;
//! let candidates = select_top_k(films.search(keyword.as_str()).await?, 3);
//! let batch = fetch_details(&films, &candidates, FanOutPolicy::AllOrNothing, limit).await?;
//! let results: Vec<_> = batch.details.into_iter().map(|d| normalizer.film(d)).collect();
//! ```

pub mod fan_out;
pub mod keyword;
pub mod normalize;
pub mod outcome;
pub mod prompt;
pub mod timeout;

// Re-export main types
pub use fan_out::{fetch_details, select_top_k, DetailBatch};
pub use keyword::parse_keyword;
pub use normalize::{ResultNormalizer, DISPLAY_NAMES};
pub use outcome::{BranchOutcome, FailedCandidate, PipelineError, PipelineResult, Stage};
pub use prompt::{build_keyword_request, PromptSettings};
pub use timeout::bounded;
