use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::domain::{ApplicantId, Metadata, VectorMatch};
use super::error::{ContractViolation, MatchError};

/// Similarity search over candidate-profile embeddings.
///
/// Results are returned most similar first, at most `top_k` of them, each as
/// the metadata stored with the profile embedding.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Metadata>, VectorIndexError>;
}

/// Failure reported by a vector index adapter.
#[derive(Debug, thiserror::Error)]
pub enum VectorIndexError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
    #[error("vector index did not answer within {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Embedding(String),
    #[error("{0}")]
    Refused(String),
    #[error("vector index returned an unexpected row: {0}")]
    Malformed(String),
}

impl From<VectorIndexError> for MatchError {
    fn from(value: VectorIndexError) -> Self {
        match value {
            VectorIndexError::Embedding(detail) => MatchError::Embedding(detail),
            VectorIndexError::Refused(detail) => MatchError::Refused {
                service: "vector index",
                detail,
            },
            VectorIndexError::Malformed(detail) => ContractViolation::MalformedResponse {
                service: "vector index",
                detail,
            }
            .into(),
            other @ (VectorIndexError::Unavailable(_) | VectorIndexError::Timeout(_)) => {
                MatchError::connectivity("vector index", other.to_string())
            }
        }
    }
}

const DEFAULT_TOP_K: NonZeroUsize = match NonZeroUsize::new(4) {
    Some(value) => value,
    None => unreachable!(),
};

/// Knobs for the semantic matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticConfig {
    pub top_k: NonZeroUsize,
    /// Metadata field carrying the applicant identifier.
    pub identifier_field: String,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            identifier_field: "name".to_string(),
        }
    }
}

/// Looks up applicants whose profile is semantically close to free text.
pub struct SemanticMatcher<V: ?Sized> {
    index: Arc<V>,
    config: SemanticConfig,
}

impl<V> SemanticMatcher<V>
where
    V: VectorIndex + ?Sized,
{
    pub fn new(index: Arc<V>, config: SemanticConfig) -> Self {
        Self { index, config }
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.config
    }

    /// Empty or whitespace-only text is rejected with [`MatchError::InvalidQuery`].
    pub async fn find_by_similarity(&self, query_text: &str) -> Result<Vec<VectorMatch>, MatchError> {
        let query_text = query_text.trim();
        if query_text.is_empty() {
            return Err(MatchError::InvalidQuery);
        }

        let results = self
            .index
            .similarity_search(query_text, self.config.top_k.get())
            .await?;

        let matches = results
            .into_iter()
            .enumerate()
            .map(|(position, metadata)| self.vector_match(position, metadata))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            top_k = self.config.top_k.get(),
            results = matches.len(),
            "vector similarity query completed"
        );

        Ok(matches)
    }

    fn vector_match(
        &self,
        position: usize,
        metadata: Metadata,
    ) -> Result<VectorMatch, ContractViolation> {
        let field = &self.config.identifier_field;
        let applicant_id = match metadata.get(field) {
            Some(Value::String(id)) => ApplicantId(id.clone()),
            Some(_) => {
                return Err(ContractViolation::InvalidIdentifier {
                    field: field.clone(),
                    position,
                })
            }
            None => {
                return Err(ContractViolation::MissingIdentifier {
                    field: field.clone(),
                    position,
                })
            }
        };

        Ok(VectorMatch {
            applicant_id,
            metadata,
        })
    }
}
