//! Candidate matching: the two read-side matchers, the hybrid ranker that
//! merges their output, and the adapters that talk to Neo4j and embedding
//! endpoints.

pub mod domain;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod neo4j;
pub mod ranker;
pub mod router;
pub mod semantic;
pub mod service;
pub mod skills;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicantId, ApplicantProfile, ApplicantRelation, CandidateQuery, Education, Experience,
    MatchSource, Metadata, RankedCandidate, SkillMatch, VectorMatch,
};
pub use embedding::{
    cosine_similarity, EmbeddingError, HashingEmbedder, HttpEmbedder, HttpEmbedderConfig, QueryEmbedder,
};
pub use error::{ContractViolation, MatchError};
pub use memory::{InMemoryCandidateGraph, InMemoryVectorIndex};
pub use neo4j::{Neo4jClient, Neo4jConfig, Neo4jSkillGraph, Neo4jVectorIndex, VectorIndexSettings};
pub use ranker::{DuplicatePolicy, HybridRanker};
pub use router::candidate_router;
pub use semantic::{SemanticConfig, SemanticMatcher, VectorIndex, VectorIndexError};
pub use service::{CandidateSearchService, SearchConfig};
pub use skills::{skill_name_matches, CandidateGraph, GraphError, SkillMatcher, SkillRow};
