//! Hybrid candidate search.
//!
//! Candidates are surfaced by two independent signals: substring skill
//! matching over an applicant graph and semantic similarity over profile
//! embeddings. [`matching::HybridRanker`] merges both into one prioritized
//! list where candidates confirmed by both signals rank first.

pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;
