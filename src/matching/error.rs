use super::domain::ApplicantId;

/// Request-level failure of a candidate search. None of these are recovered
/// locally; the request fails as a whole.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{service} unreachable: {detail}")]
    Connectivity {
        service: &'static str,
        detail: String,
    },
    #[error("{service} refused the request: {detail}")]
    Refused {
        service: &'static str,
        detail: String,
    },
    #[error("malformed skill query: {0}")]
    Query(String),
    #[error("query text must not be empty")]
    InvalidQuery,
    #[error("query text could not be embedded: {0}")]
    Embedding(String),
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

impl MatchError {
    pub(crate) fn connectivity(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Connectivity {
            service,
            detail: detail.into(),
        }
    }
}

/// Input handed to the ranker (or returned by a collaborator) broke an
/// assumption the merge relies on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("applicant {applicant_id} appears more than once in the {list} results")]
    DuplicateApplicant {
        applicant_id: ApplicantId,
        list: &'static str,
    },
    #[error("vector result #{position} has no '{field}' identifier")]
    MissingIdentifier { field: String, position: usize },
    #[error("vector result #{position} has a non-string '{field}' identifier")]
    InvalidIdentifier { field: String, position: usize },
    #[error("{service} returned a malformed row: {detail}")]
    MalformedResponse {
        service: &'static str,
        detail: String,
    },
}
