//! In-process collaborators over a roster of [`ApplicantProfile`]s, used for
//! offline runs and tests.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use super::domain::{ApplicantId, ApplicantProfile, ApplicantRelation, Metadata};
use super::embedding::{cosine_similarity, HashingEmbedder};
use super::semantic::{VectorIndex, VectorIndexError};
use super::skills::{skill_name_matches, CandidateGraph, GraphError, SkillRow};

/// Applicant graph held in process, applying the same substring skill rule
/// as the Cypher query. Profiles are keyed by name.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCandidateGraph {
    profiles: Arc<RwLock<Vec<ApplicantProfile>>>,
}

impl InMemoryCandidateGraph {
    pub fn from_profiles(profiles: impl IntoIterator<Item = ApplicantProfile>) -> Self {
        let graph = Self::default();
        for profile in profiles {
            graph.add_applicant(profile);
        }
        graph
    }

    /// Inserts the profile, replacing any profile with the same name.
    pub fn add_applicant(&self, profile: ApplicantProfile) {
        let mut guard = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.retain(|existing| existing.name != profile.name);
        guard.push(profile);
    }
}

#[async_trait]
impl CandidateGraph for InMemoryCandidateGraph {
    async fn match_skills(&self, skills: &[String]) -> Result<Vec<SkillRow>, GraphError> {
        let guard = self
            .profiles
            .read()
            .map_err(|_| GraphError::Unavailable("graph lock poisoned".to_string()))?;

        Ok(guard
            .iter()
            .filter_map(|profile| {
                let matched: Vec<String> = profile
                    .skills
                    .iter()
                    .filter(|name| skills.iter().any(|query| skill_name_matches(name, query)))
                    .cloned()
                    .collect();
                (!matched.is_empty()).then(|| SkillRow {
                    applicant: profile.name.clone(),
                    matched_skills: matched,
                })
            })
            .collect())
    }

    async fn applicant_relations(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, GraphError> {
        let guard = self
            .profiles
            .read()
            .map_err(|_| GraphError::Unavailable("graph lock poisoned".to_string()))?;

        Ok(guard
            .iter()
            .find(|profile| profile.name == applicant.as_str())
            .map(ApplicantProfile::relations)
            .unwrap_or_default())
    }
}

#[derive(Debug)]
struct IndexedApplicant {
    applicant_id: ApplicantId,
    embedding: Vec<f32>,
    metadata: Metadata,
}

/// Vector index scoring applicants by cosine similarity of hashed
/// embeddings. Holds at most one entry per applicant name.
#[derive(Debug, Default, Clone)]
pub struct InMemoryVectorIndex {
    embedder: HashingEmbedder,
    entries: Arc<RwLock<Vec<IndexedApplicant>>>,
}

impl InMemoryVectorIndex {
    pub fn from_profiles<'a>(
        profiles: impl IntoIterator<Item = &'a ApplicantProfile>,
    ) -> Result<Self, VectorIndexError> {
        let index = Self::default();
        for profile in profiles {
            index.add_applicant(profile)?;
        }
        Ok(index)
    }

    /// Embeds the profile, replacing any entry with the same name.
    pub fn add_applicant(&self, profile: &ApplicantProfile) -> Result<(), VectorIndexError> {
        let embedding = self.embedder.embed_text(&profile.embedding_text())?;
        let applicant_id = profile.applicant_id();

        let mut guard = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.retain(|entry| entry.applicant_id != applicant_id);
        guard.push(IndexedApplicant {
            applicant_id,
            embedding,
            metadata: profile.metadata(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Metadata>, VectorIndexError> {
        let query = self.embedder.embed_text(query)?;
        let guard = self
            .entries
            .read()
            .map_err(|_| VectorIndexError::Unavailable("index lock poisoned".to_string()))?;

        let mut scored: Vec<(f32, &Metadata)> = guard
            .iter()
            .map(|entry| (cosine_similarity(&query, &entry.embedding), &entry.metadata))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(_, metadata)| metadata.clone())
            .collect())
    }
}
