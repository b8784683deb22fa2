use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata stored alongside a profile embedding.
pub type Metadata = BTreeMap<String, Value>;

/// Identifier wrapper for applicants (the applicant `name` in the graph).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub String);

impl ApplicantId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One applicant surfaced by the skill graph, with the skill names that matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub applicant_id: ApplicantId,
    pub matched_skills: Vec<String>,
}

impl SkillMatch {
    pub fn new<I, S>(applicant_id: impl Into<String>, matched_skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            applicant_id: ApplicantId::new(applicant_id),
            matched_skills: matched_skills.into_iter().map(Into::into).collect(),
        }
    }
}

/// One applicant surfaced by the vector index. Position in the result list
/// encodes similarity, so callers must keep the order they received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub applicant_id: ApplicantId,
    pub metadata: Metadata,
}

impl VectorMatch {
    pub fn new(applicant_id: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            applicant_id: ApplicantId::new(applicant_id),
            metadata,
        }
    }
}

/// Which signal(s) surfaced a ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Both,
    Skills,
    Vector,
}

impl MatchSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Skills => "skills",
            Self::Vector => "vector",
        }
    }
}

/// Entry of the merged candidate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub applicant_id: ApplicantId,
    pub matched_skills: Vec<String>,
    pub source: MatchSource,
}

/// Search request combining free text with an explicit skill list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub query_text: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub company: String,
    pub duration: String,
}

/// Applicant profile as captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub work_experience: Vec<Experience>,
    #[serde(default)]
    pub internship_experience: Vec<Experience>,
}

impl ApplicantProfile {
    pub fn applicant_id(&self) -> ApplicantId {
        ApplicantId::new(self.name.clone())
    }

    /// Text the profile embedding is computed from: the summary followed by the skill list.
    pub fn embedding_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(summary.trim().to_string());
        }
        if !self.skills.is_empty() {
            parts.push(self.skills.join(", "));
        }
        parts.join("\n")
    }

    /// Metadata exposed by the vector index for this profile.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("name".to_string(), Value::from(self.name.clone()));
        metadata.insert("email".to_string(), Value::from(self.email.clone()));
        metadata.insert(
            "phone_number".to_string(),
            Value::from(self.phone_number.clone()),
        );
        if let Some(summary) = &self.summary {
            metadata.insert("summary".to_string(), Value::from(summary.clone()));
        }
        metadata
    }

    /// Outgoing graph edges for this applicant. Empty sections produce no edges.
    pub fn relations(&self) -> Vec<ApplicantRelation> {
        let mut relations = Vec::new();

        for skill in self.skills.iter().filter(|skill| !skill.trim().is_empty()) {
            relations.push(ApplicantRelation::new(
                "HAS_SKILL",
                "Skill",
                [("name", Value::from(skill.clone()))],
            ));
        }
        for education in &self.education {
            relations.push(ApplicantRelation::new(
                "HAS_EDUCATION",
                "Education",
                [
                    ("degree", Value::from(education.degree.clone())),
                    ("institution", Value::from(education.institution.clone())),
                ],
            ));
        }
        for (relationship, entries) in [
            ("WORKED_AT", &self.work_experience),
            ("INTERNED_AT", &self.internship_experience),
        ] {
            for experience in entries.iter().filter(|e| !e.company.trim().is_empty()) {
                let mut relation = ApplicantRelation::new(
                    relationship,
                    "Company",
                    [("name", Value::from(experience.company.clone()))],
                );
                relation.edge_properties.insert(
                    "duration".to_string(),
                    Value::from(experience.duration.clone()),
                );
                relations.push(relation);
            }
        }

        relations
    }
}

/// One outgoing edge of an applicant node and the node it points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRelation {
    pub relationship: String,
    pub node_labels: Vec<String>,
    pub properties: Metadata,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub edge_properties: Metadata,
}

impl ApplicantRelation {
    fn new<const N: usize>(
        relationship: &str,
        label: &str,
        properties: [(&str, Value); N],
    ) -> Self {
        Self {
            relationship: relationship.to_string(),
            node_labels: vec![label.to_string()],
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            edge_properties: Metadata::new(),
        }
    }
}
