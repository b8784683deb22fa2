use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ApplicantId, ApplicantRelation, SkillMatch};
use super::error::{ContractViolation, MatchError};
use super::ranker::union_skills;

/// Row returned by the graph store for a skill query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRow {
    pub applicant: String,
    pub matched_skills: Vec<String>,
}

/// Read-side contract of the applicant graph.
///
/// `match_skills` must return applicants linked to any skill whose name
/// contains any of `skills`, compared case-insensitively.
#[async_trait]
pub trait CandidateGraph: Send + Sync {
    async fn match_skills(&self, skills: &[String]) -> Result<Vec<SkillRow>, GraphError>;

    async fn applicant_relations(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, GraphError>;
}

/// Failure reported by a graph store adapter.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),
    #[error("graph store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("graph store rejected the query: {0}")]
    Rejected(String),
    #[error("graph store refused the request (http {status}): {detail}")]
    Refused { status: u16, detail: String },
    #[error("graph store returned an unexpected row: {0}")]
    Malformed(String),
}

impl From<GraphError> for MatchError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::Rejected(detail) => MatchError::Query(detail),
            GraphError::Malformed(detail) => ContractViolation::MalformedResponse {
                service: "graph store",
                detail,
            }
            .into(),
            GraphError::Refused { status, detail } => MatchError::Refused {
                service: "graph store",
                detail: format!("http {status}: {detail}"),
            },
            other @ (GraphError::Unavailable(_) | GraphError::Timeout(_)) => {
                MatchError::connectivity("graph store", other.to_string())
            }
        }
    }
}

/// Soft skill policy: `skill_name` contains `query_skill`, ignoring case.
pub fn skill_name_matches(skill_name: &str, query_skill: &str) -> bool {
    skill_name
        .to_lowercase()
        .contains(&query_skill.to_lowercase())
}

/// Looks up applicants by skill through a [`CandidateGraph`].
pub struct SkillMatcher<G: ?Sized> {
    graph: Arc<G>,
}

impl<G> SkillMatcher<G>
where
    G: CandidateGraph + ?Sized,
{
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &Arc<G> {
        &self.graph
    }

    /// Returns one [`SkillMatch`] per applicant, in the order the store first
    /// reported each applicant.
    pub async fn find_by_skills(&self, skills: &[String]) -> Result<Vec<SkillMatch>, MatchError> {
        let skills = normalize_skills(skills)?;
        if skills.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.graph.match_skills(&skills).await?;
        let row_count = rows.len();
        let matches = collapse_rows(rows);

        debug!(
            skills = skills.len(),
            rows = row_count,
            applicants = matches.len(),
            "skill graph query completed"
        );

        Ok(matches)
    }
}

fn normalize_skills(skills: &[String]) -> Result<Vec<String>, MatchError> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(skills.len());

    for (position, skill) in skills.iter().enumerate() {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            return Err(MatchError::Query(format!(
                "skill #{position} is blank ({skill:?})"
            )));
        }
        if seen.insert(trimmed.to_lowercase()) {
            normalized.push(trimmed.to_string());
        }
    }

    Ok(normalized)
}

fn collapse_rows(rows: Vec<SkillRow>) -> Vec<SkillMatch> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut matches: Vec<SkillMatch> = Vec::with_capacity(rows.len());

    for row in rows {
        if let Some(&index) = positions.get(&row.applicant) {
            union_skills(&mut matches[index].matched_skills, &row.matched_skills);
            continue;
        }
        positions.insert(row.applicant.clone(), matches.len());
        matches.push(SkillMatch {
            applicant_id: ApplicantId(row.applicant),
            matched_skills: row.matched_skills,
        });
    }

    matches
}
