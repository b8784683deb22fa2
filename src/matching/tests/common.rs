use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::matching::domain::{
    ApplicantId, ApplicantProfile, ApplicantRelation, Education, Experience, Metadata,
    SkillMatch, VectorMatch,
};
use crate::matching::memory::{InMemoryCandidateGraph, InMemoryVectorIndex};
use crate::matching::semantic::{VectorIndex, VectorIndexError};
use crate::matching::skills::{CandidateGraph, GraphError, SkillRow};
use crate::matching::{candidate_router, CandidateSearchService, SearchConfig};

pub(super) fn skill(id: &str, skills: &[&str]) -> SkillMatch {
    SkillMatch::new(id, skills.iter().copied())
}

pub(super) fn vector(id: &str) -> VectorMatch {
    VectorMatch::new(id, metadata(id))
}

pub(super) fn metadata(id: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("name".to_string(), Value::from(id));
    metadata
}

pub(super) fn ids<'a, I>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ApplicantId>,
{
    candidates.into_iter().map(|id| id.0.clone()).collect()
}

pub(super) fn profile(name: &str, summary: &str, skills: &[&str]) -> ApplicantProfile {
    ApplicantProfile {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone_number: "555-0100".to_string(),
        summary: Some(summary.to_string()),
        skills: skills.iter().map(|s| s.to_string()).collect(),
        education: vec![Education {
            degree: "BSc Computer Science".to_string(),
            institution: "State University".to_string(),
        }],
        work_experience: vec![Experience {
            company: "Initech".to_string(),
            duration: "2 years".to_string(),
        }],
        internship_experience: Vec::new(),
    }
}

pub(super) fn roster() -> Vec<ApplicantProfile> {
    vec![
        profile(
            "Ada",
            "Backend engineer building payment services in Java and Kotlin",
            &["Java", "Kotlin", "PostgreSQL"],
        ),
        profile(
            "Grace",
            "Data scientist shipping machine learning pipelines in Python",
            &["Python", "PyTorch", "SQL"],
        ),
        profile(
            "Linus",
            "Systems programmer focused on kernels, Rust and C",
            &["C", "Rust", "Linux"],
        ),
    ]
}

pub(super) fn roster_graph() -> InMemoryCandidateGraph {
    InMemoryCandidateGraph::from_profiles(roster())
}

pub(super) fn roster_index() -> InMemoryVectorIndex {
    InMemoryVectorIndex::from_profiles(&roster()).expect("roster embeds")
}

/// Graph that replays fixed rows and counts how often it was queried.
#[derive(Default)]
pub(super) struct ScriptedGraph {
    pub(super) rows: Vec<SkillRow>,
    pub(super) calls: AtomicUsize,
}

impl ScriptedGraph {
    pub(super) fn with_rows(rows: &[(&str, &[&str])]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|(applicant, skills)| SkillRow {
                    applicant: applicant.to_string(),
                    matched_skills: skills.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateGraph for ScriptedGraph {
    async fn match_skills(&self, _skills: &[String]) -> Result<Vec<SkillRow>, GraphError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.clone())
    }

    async fn applicant_relations(
        &self,
        _applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, GraphError> {
        Ok(Vec::new())
    }
}

/// Index that replays fixed metadata, honoring `top_k`.
#[derive(Default)]
pub(super) struct ScriptedIndex {
    pub(super) results: Vec<Metadata>,
    pub(super) requested_top_k: AtomicUsize,
}

impl ScriptedIndex {
    pub(super) fn with_names(names: &[&str]) -> Self {
        Self {
            results: names.iter().map(|name| metadata(name)).collect(),
            requested_top_k: AtomicUsize::new(0),
        }
    }

    pub(super) fn with_metadata(results: Vec<Metadata>) -> Self {
        Self {
            results,
            requested_top_k: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<Metadata>, VectorIndexError> {
        self.requested_top_k.store(top_k, Ordering::SeqCst);
        Ok(self.results.iter().take(top_k).cloned().collect())
    }
}

pub(super) enum FailingGraph {
    Unavailable,
    Rejecting,
    Refusing,
    Garbled,
    Slow(Duration),
}

#[async_trait]
impl CandidateGraph for FailingGraph {
    async fn match_skills(&self, _skills: &[String]) -> Result<Vec<SkillRow>, GraphError> {
        match self {
            FailingGraph::Unavailable => {
                Err(GraphError::Unavailable("connection refused".to_string()))
            }
            FailingGraph::Rejecting => Err(GraphError::Rejected(
                "Neo.ClientError.Statement.TypeError".to_string(),
            )),
            FailingGraph::Refusing => Err(GraphError::Refused {
                status: 401,
                detail: "Neo.ClientError.Security.Unauthorized".to_string(),
            }),
            FailingGraph::Garbled => Err(GraphError::Malformed(
                "applicant column: Some(Null)".to_string(),
            )),
            FailingGraph::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Vec::new())
            }
        }
    }

    async fn applicant_relations(
        &self,
        _applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, GraphError> {
        Err(GraphError::Unavailable("connection refused".to_string()))
    }
}

pub(super) enum FailingIndex {
    Unavailable,
    Unembeddable,
    Garbled,
}

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<Metadata>, VectorIndexError> {
        match self {
            FailingIndex::Unavailable => {
                Err(VectorIndexError::Unavailable("index offline".to_string()))
            }
            FailingIndex::Unembeddable => {
                Err(VectorIndexError::Embedding("model not loaded".to_string()))
            }
            FailingIndex::Garbled => Err(VectorIndexError::Malformed(
                "unexpected vector row: Some(Null)".to_string(),
            )),
        }
    }
}

pub(super) fn roster_service(
) -> CandidateSearchService<InMemoryCandidateGraph, InMemoryVectorIndex> {
    CandidateSearchService::new(
        Arc::new(roster_graph()),
        Arc::new(roster_index()),
        SearchConfig::default(),
    )
}

pub(super) fn roster_router() -> axum::Router {
    candidate_router(Arc::new(roster_service()))
}

pub(super) fn search_body(query_text: &str, skills: &[&str]) -> String {
    json!({ "query_text": query_text, "skills": skills }).to_string()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
