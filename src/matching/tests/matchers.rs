use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::Value;

use super::common::*;
use crate::matching::error::{ContractViolation, MatchError};
use crate::matching::semantic::{SemanticConfig, SemanticMatcher};
use crate::matching::skills::{skill_name_matches, SkillMatcher};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn skill_names_match_by_case_insensitive_containment() {
    assert!(skill_name_matches("JavaScript", "java"));
    assert!(skill_name_matches("java", "JAVA"));
    assert!(skill_name_matches("Machine Learning", "learn"));
    assert!(!skill_name_matches("Go", "golang"));
}

#[tokio::test]
async fn empty_skill_list_returns_nothing_without_querying() {
    let graph = Arc::new(ScriptedGraph::with_rows(&[("Ada", &["Java"])]));
    let matcher = SkillMatcher::new(graph.clone());

    let matches = matcher.find_by_skills(&[]).await.expect("empty query ok");

    assert!(matches.is_empty());
    assert_eq!(graph.calls(), 0);
}

#[tokio::test]
async fn blank_skill_is_a_query_error() {
    let graph = Arc::new(ScriptedGraph::default());
    let matcher = SkillMatcher::new(graph.clone());

    let result = matcher.find_by_skills(&strings(&["rust", "  "])).await;

    assert!(matches!(result, Err(MatchError::Query(_))));
    assert_eq!(graph.calls(), 0);
}

#[tokio::test]
async fn substring_matching_over_roster() {
    let matcher = SkillMatcher::new(Arc::new(roster_graph()));

    let matches = matcher
        .find_by_skills(&strings(&["SQL", "rust"]))
        .await
        .expect("query succeeds");

    let found: Vec<(String, Vec<String>)> = matches
        .into_iter()
        .map(|m| (m.applicant_id.0, m.matched_skills))
        .collect();
    assert_eq!(
        found,
        vec![
            ("Ada".to_string(), strings(&["PostgreSQL"])),
            ("Grace".to_string(), strings(&["SQL"])),
            ("Linus".to_string(), strings(&["Rust"])),
        ]
    );
}

#[tokio::test]
async fn rows_for_the_same_applicant_are_collapsed() {
    let graph = Arc::new(ScriptedGraph::with_rows(&[
        ("Ada", &["Java"]),
        ("Grace", &["Python"]),
        ("Ada", &["JavaScript", "Java"]),
    ]));
    let matcher = SkillMatcher::new(graph);

    let matches = matcher
        .find_by_skills(&strings(&["java", "python"]))
        .await
        .expect("query succeeds");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].applicant_id.0, "Ada");
    assert_eq!(matches[0].matched_skills, strings(&["Java", "JavaScript"]));
    assert_eq!(matches[1].applicant_id.0, "Grace");
}

#[tokio::test]
async fn graph_failures_map_to_request_errors() {
    let unreachable = SkillMatcher::new(Arc::new(FailingGraph::Unavailable));
    let rejected = SkillMatcher::new(Arc::new(FailingGraph::Rejecting));
    let skills = strings(&["rust"]);

    assert!(matches!(
        unreachable.find_by_skills(&skills).await,
        Err(MatchError::Connectivity {
            service: "graph store",
            ..
        })
    ));
    assert!(matches!(
        rejected.find_by_skills(&skills).await,
        Err(MatchError::Query(_))
    ));
}

#[tokio::test]
async fn garbled_and_refused_graph_responses_are_not_connectivity_errors() {
    let garbled = SkillMatcher::new(Arc::new(FailingGraph::Garbled));
    let refused = SkillMatcher::new(Arc::new(FailingGraph::Refusing));
    let skills = strings(&["rust"]);

    assert!(matches!(
        garbled.find_by_skills(&skills).await,
        Err(MatchError::ContractViolation(
            ContractViolation::MalformedResponse {
                service: "graph store",
                ..
            }
        ))
    ));
    assert!(matches!(
        refused.find_by_skills(&skills).await,
        Err(MatchError::Refused {
            service: "graph store",
            ..
        })
    ));
}

#[tokio::test]
async fn empty_query_text_is_rejected() {
    let index = Arc::new(ScriptedIndex::with_names(&["Ada"]));
    let matcher = SemanticMatcher::new(index.clone(), SemanticConfig::default());

    let result = matcher.find_by_similarity("   ").await;

    assert!(matches!(result, Err(MatchError::InvalidQuery)));
    assert_eq!(index.requested_top_k.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn similarity_results_keep_index_order_and_top_k() {
    let index = Arc::new(ScriptedIndex::with_names(&["Eve", "Ada", "Bob", "Cy", "Dee"]));
    let matcher = SemanticMatcher::new(index.clone(), SemanticConfig::default());

    let matches = matcher
        .find_by_similarity("backend engineer")
        .await
        .expect("search succeeds");

    assert_eq!(index.requested_top_k.load(Ordering::SeqCst), 4);
    assert_eq!(
        ids(matches.iter().map(|m| &m.applicant_id)),
        vec!["Eve", "Ada", "Bob", "Cy"]
    );
    assert_eq!(matches[0].metadata.get("name"), Some(&Value::from("Eve")));
}

#[tokio::test]
async fn configured_top_k_reaches_the_index() {
    let index = Arc::new(ScriptedIndex::with_names(&["Eve", "Ada", "Bob"]));
    let config = SemanticConfig {
        top_k: NonZeroUsize::MIN,
        ..SemanticConfig::default()
    };
    let matcher = SemanticMatcher::new(index.clone(), config);

    let matches = matcher
        .find_by_similarity("backend engineer")
        .await
        .expect("search succeeds");

    assert_eq!(index.requested_top_k.load(Ordering::SeqCst), 1);
    assert_eq!(ids(matches.iter().map(|m| &m.applicant_id)), vec!["Eve"]);
}

#[test]
fn top_k_of_zero_cannot_be_configured() {
    assert!(NonZeroUsize::new(0).is_none());
    assert!("0".parse::<NonZeroUsize>().is_err());
    assert_eq!(SemanticConfig::default().top_k.get(), 4);
}

#[tokio::test]
async fn identifier_field_is_configurable() {
    let mut record = metadata("ignored");
    record.insert("applicant_id".to_string(), Value::from("app-7"));
    let index = Arc::new(ScriptedIndex::with_metadata(vec![record]));
    let config = SemanticConfig {
        top_k: NonZeroUsize::new(2).expect("non-zero"),
        identifier_field: "applicant_id".to_string(),
    };
    let matcher = SemanticMatcher::new(index, config);

    let matches = matcher.find_by_similarity("rust").await.expect("search succeeds");

    assert_eq!(matches[0].applicant_id.0, "app-7");
}

#[tokio::test]
async fn result_without_identifier_is_a_contract_violation() {
    let mut anonymous = metadata("x");
    anonymous.remove("name");
    anonymous.insert("email".to_string(), Value::from("x@example.com"));
    let index = Arc::new(ScriptedIndex::with_metadata(vec![metadata("Ada"), anonymous]));
    let matcher = SemanticMatcher::new(index, SemanticConfig::default());

    match matcher.find_by_similarity("rust").await {
        Err(MatchError::ContractViolation(ContractViolation::MissingIdentifier {
            field,
            position,
        })) => {
            assert_eq!(field, "name");
            assert_eq!(position, 1);
        }
        other => panic!("expected missing identifier, got {other:?}"),
    }
}

#[tokio::test]
async fn non_string_identifier_is_a_contract_violation() {
    let mut record = metadata("x");
    record.insert("name".to_string(), Value::from(42));
    let index = Arc::new(ScriptedIndex::with_metadata(vec![record]));
    let matcher = SemanticMatcher::new(index, SemanticConfig::default());

    assert!(matches!(
        matcher.find_by_similarity("rust").await,
        Err(MatchError::ContractViolation(
            ContractViolation::InvalidIdentifier { .. }
        ))
    ));
}

#[tokio::test]
async fn index_failures_map_to_request_errors() {
    let offline = SemanticMatcher::new(Arc::new(FailingIndex::Unavailable), SemanticConfig::default());
    let unembeddable =
        SemanticMatcher::new(Arc::new(FailingIndex::Unembeddable), SemanticConfig::default());

    assert!(matches!(
        offline.find_by_similarity("rust").await,
        Err(MatchError::Connectivity {
            service: "vector index",
            ..
        })
    ));
    assert!(matches!(
        unembeddable.find_by_similarity("rust").await,
        Err(MatchError::Embedding(_))
    ));
}

#[tokio::test]
async fn garbled_vector_rows_are_contract_violations() {
    let matcher = SemanticMatcher::new(Arc::new(FailingIndex::Garbled), SemanticConfig::default());

    assert!(matches!(
        matcher.find_by_similarity("rust").await,
        Err(MatchError::ContractViolation(
            ContractViolation::MalformedResponse {
                service: "vector index",
                ..
            }
        ))
    ));
}
