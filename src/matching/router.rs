use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{ApplicantId, ApplicantRelation, CandidateQuery, RankedCandidate};
use super::error::MatchError;
use super::semantic::VectorIndex;
use super::service::CandidateSearchService;
use super::skills::CandidateGraph;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub candidates: Vec<RankedCandidate>,
}

#[derive(Debug, Serialize)]
pub struct ApplicantResponse {
    pub applicant: ApplicantId,
    pub relations: Vec<ApplicantRelation>,
}

/// Router builder exposing candidate search and applicant lookup.
pub fn candidate_router<G, V>(service: Arc<CandidateSearchService<G, V>>) -> Router
where
    G: CandidateGraph + ?Sized + 'static,
    V: VectorIndex + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/candidates/search", post(search_handler::<G, V>))
        .route(
            "/api/v1/candidates/:applicant",
            get(applicant_handler::<G, V>),
        )
        .with_state(service)
}

pub(crate) async fn search_handler<G, V>(
    State(service): State<Arc<CandidateSearchService<G, V>>>,
    axum::Json(query): axum::Json<CandidateQuery>,
) -> Response
where
    G: CandidateGraph + ?Sized + 'static,
    V: VectorIndex + ?Sized + 'static,
{
    match service.search(&query).await {
        Ok(candidates) => {
            (StatusCode::OK, axum::Json(SearchResponse { candidates })).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn applicant_handler<G, V>(
    State(service): State<Arc<CandidateSearchService<G, V>>>,
    Path(applicant): Path<String>,
) -> Response
where
    G: CandidateGraph + ?Sized + 'static,
    V: VectorIndex + ?Sized + 'static,
{
    let applicant = ApplicantId(applicant);
    match service.applicant(&applicant).await {
        Ok(relations) if relations.is_empty() => {
            let payload = json!({
                "error": format!("applicant {applicant} not found"),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Ok(relations) => (
            StatusCode::OK,
            axum::Json(ApplicantResponse {
                applicant,
                relations,
            }),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn status_for(error: &MatchError) -> StatusCode {
    match error {
        MatchError::InvalidQuery | MatchError::Query(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MatchError::Connectivity { .. } => StatusCode::SERVICE_UNAVAILABLE,
        MatchError::Embedding(_) | MatchError::Refused { .. } | MatchError::ContractViolation(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn error_response(error: MatchError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (status_for(&error), axum::Json(payload)).into_response()
}
