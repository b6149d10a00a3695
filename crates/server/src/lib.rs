//! Orchestration layer of the mood recommendation engine.
//!
//! This crate wires the upstream clients into the pipeline and exposes the
//! two interactive surfaces built on top of it:
//! - `RecommendationOrchestrator`: one mood in, keyword plus films and tracks out
//! - `RecommendationSession`: overlapping requests, last request wins
//! - `ChatSession`: free-form conversation with the completion model

pub mod chat;
pub mod generation;
pub mod orchestrator;
pub mod session;

pub use chat::ChatSession;
pub use generation::{Generation, RequestToken};
pub use orchestrator::RecommendationOrchestrator;
pub use session::{DisplayState, RecommendationSession};
