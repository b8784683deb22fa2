//! Neo4j adapters speaking the HTTP transactional Cypher endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::domain::{ApplicantId, ApplicantRelation, Metadata};
use super::embedding::QueryEmbedder;
use super::semantic::{VectorIndex, VectorIndexError};
use super::skills::{CandidateGraph, GraphError, SkillRow};

pub(crate) const SKILL_MATCH_QUERY: &str = "\
MATCH (a:Applicant)-[:HAS_SKILL]->(s:Skill)
WHERE ANY(skill IN $skills WHERE toLower(s.name) CONTAINS toLower(skill))
RETURN a.name AS applicant, collect(s.name) AS matched_skills";

pub(crate) const APPLICANT_RELATIONS_QUERY: &str = "\
MATCH (a:Applicant {name: $name})-[r]->(n)
RETURN type(r) AS relationship, labels(n) AS node_labels, properties(n) AS properties, properties(r) AS edge_properties";

pub(crate) const VECTOR_SEARCH_QUERY: &str = "\
CALL db.index.vector.queryNodes($index_name, $top_k, $embedding)
YIELD node, score
RETURN node { .* } AS metadata, score
ORDER BY score DESC";

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Base HTTP URL, e.g. `http://localhost:7474`.
    pub url: String,
    pub username: String,
    pub password: String,
    pub database: String,
    pub timeout: Duration,
}

/// Vector index parameters for the applicant embeddings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorIndexSettings {
    pub index_name: String,
    /// Node property holding the embedding; stripped from returned metadata.
    pub embedding_property: String,
}

impl Default for VectorIndexSettings {
    fn default() -> Self {
        Self {
            index_name: "applicant_embeddings".to_string(),
            embedding_property: "embedding".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<ResultRow>,
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

/// Thin client for `POST /db/{database}/tx/commit`. Cloning shares the
/// underlying connection pool.
#[derive(Debug, Clone)]
pub struct Neo4jClient {
    client: Client,
    endpoint: String,
    config: Arc<Neo4jConfig>,
}

impl Neo4jClient {
    pub fn connect(config: Neo4jConfig) -> Result<Self, GraphError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GraphError::Unavailable(format!("failed to build client: {err}")))?;
        let endpoint = format!(
            "{}/db/{}/tx/commit",
            config.url.trim_end_matches('/'),
            config.database
        );

        info!(%endpoint, "neo4j client configured");

        Ok(Self {
            client,
            endpoint,
            config: Arc::new(config),
        })
    }

    /// Runs one auto-committed statement and returns its rows.
    pub async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>, GraphError> {
        let request = CommitRequest {
            statements: [Statement {
                statement,
                parameters,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body: CommitResponse = response
            .json()
            .await
            .map_err(|err| self.transport_error(err))?;

        if let Some(error) = body.errors.into_iter().next() {
            let detail = format!("{}: {}", error.code, error.message);
            return Err(if error.code.starts_with("Neo.ClientError") {
                GraphError::Rejected(detail)
            } else {
                GraphError::Unavailable(detail)
            });
        }

        let rows: Vec<Vec<Value>> = body
            .results
            .into_iter()
            .next()
            .map(|result| result.data.into_iter().map(|row| row.row).collect())
            .unwrap_or_default();

        debug!(rows = rows.len(), "neo4j statement committed");
        Ok(rows)
    }

    fn transport_error(&self, err: reqwest::Error) -> GraphError {
        if err.is_timeout() {
            GraphError::Timeout(self.config.timeout)
        } else if err.is_decode() {
            GraphError::Malformed(err.to_string())
        } else {
            GraphError::Unavailable(err.to_string())
        }
    }
}

/// [`CandidateGraph`] backed by Neo4j.
#[derive(Debug, Clone)]
pub struct Neo4jSkillGraph {
    client: Neo4jClient,
}

impl Neo4jSkillGraph {
    pub fn new(client: Neo4jClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CandidateGraph for Neo4jSkillGraph {
    async fn match_skills(&self, skills: &[String]) -> Result<Vec<SkillRow>, GraphError> {
        let rows = self
            .client
            .run(SKILL_MATCH_QUERY, json!({ "skills": skills }))
            .await?;

        rows.into_iter().map(skill_row).collect()
    }

    async fn applicant_relations(
        &self,
        applicant: &ApplicantId,
    ) -> Result<Vec<ApplicantRelation>, GraphError> {
        let rows = self
            .client
            .run(APPLICANT_RELATIONS_QUERY, json!({ "name": applicant.as_str() }))
            .await?;

        rows.into_iter().map(relation_row).collect()
    }
}

/// [`VectorIndex`] backed by a Neo4j vector index over applicant nodes.
pub struct Neo4jVectorIndex<E> {
    client: Neo4jClient,
    embedder: E,
    settings: VectorIndexSettings,
}

impl<E> Neo4jVectorIndex<E>
where
    E: QueryEmbedder,
{
    pub fn new(client: Neo4jClient, embedder: E, settings: VectorIndexSettings) -> Self {
        Self {
            client,
            embedder,
            settings,
        }
    }
}

#[async_trait]
impl<E> VectorIndex for Neo4jVectorIndex<E>
where
    E: QueryEmbedder,
{
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Metadata>, VectorIndexError> {
        let embedding = self.embedder.embed(query).await?;
        let parameters = json!({
            "index_name": self.settings.index_name,
            "top_k": top_k,
            "embedding": embedding,
        });

        let rows = self
            .client
            .run(VECTOR_SEARCH_QUERY, parameters)
            .await
            .map_err(vector_error)?;

        rows.into_iter()
            .map(|row| vector_row(row, &self.settings.embedding_property))
            .collect()
    }
}

/// Client errors other than request timeout and rate limiting are refusals;
/// the rest are treated as the server being unavailable.
fn status_error(status: StatusCode, body: String) -> GraphError {
    let retryable = status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS;
    if status.is_client_error() && !retryable {
        GraphError::Refused {
            status: status.as_u16(),
            detail: body,
        }
    } else {
        GraphError::Unavailable(format!("http {status}: {body}"))
    }
}

fn vector_error(err: GraphError) -> VectorIndexError {
    match err {
        GraphError::Timeout(limit) => VectorIndexError::Timeout(limit),
        GraphError::Malformed(detail) => VectorIndexError::Malformed(detail),
        GraphError::Rejected(detail) => VectorIndexError::Refused(detail),
        GraphError::Refused { status, detail } => {
            VectorIndexError::Refused(format!("http {status}: {detail}"))
        }
        GraphError::Unavailable(detail) => VectorIndexError::Unavailable(detail),
    }
}

fn vector_row(row: Vec<Value>, embedding_property: &str) -> Result<Metadata, VectorIndexError> {
    let mut metadata = match row.into_iter().next() {
        Some(Value::Object(map)) => into_metadata(map),
        other => {
            return Err(VectorIndexError::Malformed(format!(
                "unexpected vector row: {other:?}"
            )))
        }
    };
    metadata.remove(embedding_property);
    Ok(metadata)
}

fn skill_row(row: Vec<Value>) -> Result<SkillRow, GraphError> {
    let mut columns = row.into_iter();
    let applicant = match columns.next() {
        Some(Value::String(name)) => name,
        other => return Err(GraphError::Malformed(format!("applicant column: {other:?}"))),
    };
    let matched_skills = match columns.next() {
        Some(Value::Array(values)) => values
            .into_iter()
            .filter_map(|value| match value {
                Value::String(skill) => Some(skill),
                _ => None,
            })
            .collect(),
        other => {
            return Err(GraphError::Malformed(format!(
                "matched_skills column: {other:?}"
            )))
        }
    };

    Ok(SkillRow {
        applicant,
        matched_skills,
    })
}

fn relation_row(row: Vec<Value>) -> Result<ApplicantRelation, GraphError> {
    let mut columns = row.into_iter();
    let relationship = match columns.next() {
        Some(Value::String(kind)) => kind,
        other => return Err(GraphError::Malformed(format!("relationship column: {other:?}"))),
    };
    let node_labels = match columns.next() {
        Some(Value::Array(labels)) => labels
            .into_iter()
            .filter_map(|label| label.as_str().map(str::to_string))
            .collect(),
        other => return Err(GraphError::Malformed(format!("node_labels column: {other:?}"))),
    };
    let properties = match columns.next() {
        Some(Value::Object(map)) => into_metadata(map),
        other => return Err(GraphError::Malformed(format!("properties column: {other:?}"))),
    };
    let edge_properties = match columns.next() {
        Some(Value::Object(map)) => into_metadata(map),
        _ => Metadata::new(),
    };

    Ok(ApplicantRelation {
        relationship,
        node_labels,
        properties,
        edge_properties,
    })
}

fn into_metadata(map: Map<String, Value>) -> Metadata {
    map.into_iter().collect()
}
