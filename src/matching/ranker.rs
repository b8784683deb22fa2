use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{ApplicantId, MatchSource, RankedCandidate, SkillMatch, VectorMatch};
use super::error::ContractViolation;

/// How the ranker treats an applicant that appears twice in one input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep the first occurrence in place and union later skill lists into it.
    #[default]
    Merge,
    /// Fail the merge with [`ContractViolation::DuplicateApplicant`].
    Reject,
}

impl DuplicatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "merge" => Some(Self::Merge),
            "reject" | "strict" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Merges skill and vector results by source precedence:
/// both signals, then skills only, then vector only.
#[derive(Debug, Clone, Copy, Default)]
pub struct HybridRanker {
    duplicates: DuplicatePolicy,
}

impl HybridRanker {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self { duplicates }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    pub fn rank(
        &self,
        skill_matches: &[SkillMatch],
        vector_matches: &[VectorMatch],
    ) -> Result<Vec<RankedCandidate>, ContractViolation> {
        let skills = self.unique_skill_matches(skill_matches)?;
        let vectors = self.unique_vector_ids(vector_matches)?;

        let skill_ids: HashSet<&ApplicantId> =
            skills.iter().map(|entry| &entry.applicant_id).collect();
        let common: HashSet<&ApplicantId> = vectors
            .iter()
            .copied()
            .filter(|id| skill_ids.contains(id))
            .collect();

        let mut ranked = Vec::with_capacity(skills.len() + vectors.len() - common.len());

        ranked.extend(
            skills
                .iter()
                .filter(|entry| common.contains(&entry.applicant_id))
                .map(|entry| ranked_from_skills(entry, MatchSource::Both)),
        );
        ranked.extend(
            skills
                .iter()
                .filter(|entry| !common.contains(&entry.applicant_id))
                .map(|entry| ranked_from_skills(entry, MatchSource::Skills)),
        );
        ranked.extend(
            vectors
                .iter()
                .filter(|id| !skill_ids.contains(*id))
                .map(|id| RankedCandidate {
                    applicant_id: (*id).clone(),
                    matched_skills: Vec::new(),
                    source: MatchSource::Vector,
                }),
        );

        debug!(
            skill_matches = skills.len(),
            vector_matches = vectors.len(),
            overlap = common.len(),
            ranked = ranked.len(),
            "merged candidate signals"
        );

        Ok(ranked)
    }

    fn unique_skill_matches(
        &self,
        skill_matches: &[SkillMatch],
    ) -> Result<Vec<SkillMatch>, ContractViolation> {
        let mut positions: HashMap<&ApplicantId, usize> = HashMap::new();
        let mut unique: Vec<SkillMatch> = Vec::with_capacity(skill_matches.len());

        for entry in skill_matches {
            match positions.get(&entry.applicant_id) {
                Some(&index) => {
                    if self.duplicates == DuplicatePolicy::Reject {
                        return Err(ContractViolation::DuplicateApplicant {
                            applicant_id: entry.applicant_id.clone(),
                            list: "skill",
                        });
                    }
                    union_skills(&mut unique[index].matched_skills, &entry.matched_skills);
                }
                None => {
                    positions.insert(&entry.applicant_id, unique.len());
                    unique.push(entry.clone());
                }
            }
        }

        Ok(unique)
    }

    fn unique_vector_ids<'a>(
        &self,
        vector_matches: &'a [VectorMatch],
    ) -> Result<Vec<&'a ApplicantId>, ContractViolation> {
        let mut seen: HashSet<&ApplicantId> = HashSet::with_capacity(vector_matches.len());
        let mut unique = Vec::with_capacity(vector_matches.len());

        for entry in vector_matches {
            if seen.insert(&entry.applicant_id) {
                unique.push(&entry.applicant_id);
            } else if self.duplicates == DuplicatePolicy::Reject {
                return Err(ContractViolation::DuplicateApplicant {
                    applicant_id: entry.applicant_id.clone(),
                    list: "vector",
                });
            }
        }

        Ok(unique)
    }
}

fn ranked_from_skills(entry: &SkillMatch, source: MatchSource) -> RankedCandidate {
    RankedCandidate {
        applicant_id: entry.applicant_id.clone(),
        matched_skills: entry.matched_skills.clone(),
        source,
    }
}

/// Appends the skills from `additional` that `existing` does not hold yet.
pub(crate) fn union_skills(existing: &mut Vec<String>, additional: &[String]) {
    for skill in additional {
        if !existing.contains(skill) {
            existing.push(skill.clone());
        }
    }
}
