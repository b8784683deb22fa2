use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::domain::{ApplicantId, ApplicantRelation, CandidateQuery, RankedCandidate};
use super::error::MatchError;
use super::ranker::{DuplicatePolicy, HybridRanker};
use super::semantic::{SemanticConfig, SemanticMatcher, VectorIndex};
use super::skills::{CandidateGraph, SkillMatcher};

/// Tuning for a [`CandidateSearchService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub semantic: SemanticConfig,
    pub duplicates: DuplicatePolicy,
    pub graph_timeout: Duration,
    pub vector_timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            semantic: SemanticConfig::default(),
            duplicates: DuplicatePolicy::default(),
            graph_timeout: Duration::from_secs(10),
            vector_timeout: Duration::from_secs(10),
        }
    }
}

/// Service composing the skill matcher, semantic matcher, and hybrid ranker.
pub struct CandidateSearchService<G: ?Sized, V: ?Sized> {
    skills: SkillMatcher<G>,
    semantic: SemanticMatcher<V>,
    ranker: HybridRanker,
    graph_timeout: Duration,
    vector_timeout: Duration,
}

impl<G, V> CandidateSearchService<G, V>
where
    G: CandidateGraph + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(graph: Arc<G>, index: Arc<V>, config: SearchConfig) -> Self {
        let SearchConfig {
            semantic,
            duplicates,
            graph_timeout,
            vector_timeout,
        } = config;

        Self {
            skills: SkillMatcher::new(graph),
            semantic: SemanticMatcher::new(index, semantic),
            ranker: HybridRanker::new(duplicates),
            graph_timeout,
            vector_timeout,
        }
    }

    /// Run both lookups concurrently and merge them. Either lookup failing
    /// fails the whole search.
    pub async fn search(&self, query: &CandidateQuery) -> Result<Vec<RankedCandidate>, MatchError> {
        let started = Instant::now();

        let skill_lookup = bounded(
            "graph store",
            self.graph_timeout,
            self.skills.find_by_skills(&query.skills),
        );
        let vector_lookup = bounded(
            "vector index",
            self.vector_timeout,
            self.semantic.find_by_similarity(&query.query_text),
        );

        let (skill_matches, vector_matches) = tokio::try_join!(skill_lookup, vector_lookup)
            .inspect_err(|err| warn!(error = %err, "candidate search failed"))?;

        let ranked = self.ranker.rank(&skill_matches, &vector_matches)?;

        info!(
            skills = query.skills.len(),
            skill_matches = skill_matches.len(),
            vector_matches = vector_matches.len(),
            candidates = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "candidate search completed"
        );

        Ok(ranked)
    }

    /// Outgoing relations (skills, education, employers) of one applicant.
    pub async fn applicant(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, MatchError> {
        let lookup = async {
            self.skills
                .graph()
                .applicant_relations(applicant)
                .await
                .map_err(MatchError::from)
        };
        bounded("graph store", self.graph_timeout, lookup).await
    }
}

async fn bounded<T, F>(service: &'static str, limit: Duration, lookup: F) -> Result<T, MatchError>
where
    F: Future<Output = Result<T, MatchError>>,
{
    match tokio::time::timeout(limit, lookup).await {
        Ok(result) => result,
        Err(_) => {
            warn!(service, ?limit, "lookup timed out");
            Err(MatchError::connectivity(
                service,
                format!("no answer within {limit:?}"),
            ))
        }
    }
}
