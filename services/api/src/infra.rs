use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_scout::config::{AppConfig, GraphBackendConfig};
use talent_scout::error::AppError;
use talent_scout::matching::{
    ApplicantProfile, CandidateGraph, CandidateSearchService, Education, Experience, HttpEmbedder,
    InMemoryCandidateGraph, InMemoryVectorIndex, Neo4jClient, Neo4jSkillGraph, Neo4jVectorIndex,
    VectorIndex,
};
use tracing::info;

pub(crate) type SearchService = CandidateSearchService<dyn CandidateGraph, dyn VectorIndex>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the search service against Neo4j when configured, otherwise
/// against the in-memory demo roster.
pub(crate) fn build_search_service(config: &AppConfig) -> Result<Arc<SearchService>, AppError> {
    let (graph, index): (Arc<dyn CandidateGraph>, Arc<dyn VectorIndex>) = match &config.graph {
        Some(backend) => neo4j_backend(backend)?,
        None => {
            let (graph, index) = demo_backend()?;
            (Arc::new(graph), Arc::new(index))
        }
    };

    Ok(Arc::new(CandidateSearchService::new(
        graph,
        index,
        config.search.clone(),
    )))
}

fn neo4j_backend(
    backend: &GraphBackendConfig,
) -> Result<(Arc<dyn CandidateGraph>, Arc<dyn VectorIndex>), AppError> {
    let client = Neo4jClient::connect(backend.neo4j.clone())?;
    let embedder = HttpEmbedder::new(backend.embedder.clone())?;

    info!(
        url = %backend.neo4j.url,
        index = %backend.vector_index.index_name,
        "using neo4j candidate backend"
    );

    Ok((
        Arc::new(Neo4jSkillGraph::new(client.clone())),
        Arc::new(Neo4jVectorIndex::new(
            client,
            embedder,
            backend.vector_index.clone(),
        )),
    ))
}

pub(crate) fn demo_backend() -> Result<(InMemoryCandidateGraph, InMemoryVectorIndex), AppError> {
    let roster = demo_roster();
    let index = InMemoryVectorIndex::from_profiles(&roster)
        .map_err(|err| AppError::Backend(err.to_string()))?;
    let graph = InMemoryCandidateGraph::from_profiles(roster);

    info!("using in-memory demo roster");
    Ok((graph, index))
}

pub(crate) fn demo_roster() -> Vec<ApplicantProfile> {
    vec![
        demo_profile(
            "Priya Raman",
            "Backend engineer building payment services in Java and Kotlin on PostgreSQL",
            &["Java", "Kotlin", "PostgreSQL", "Docker"],
            ("Fintech Labs", "3 years"),
        ),
        demo_profile(
            "Mateo Alvarez",
            "Data scientist shipping machine learning pipelines in Python with PyTorch",
            &["Python", "PyTorch", "SQL", "Airflow"],
            ("Insight Analytics", "2 years"),
        ),
        demo_profile(
            "Hana Sato",
            "Systems programmer working on storage engines in Rust and C",
            &["Rust", "C", "Linux", "gRPC"],
            ("Blockworks", "4 years"),
        ),
        demo_profile(
            "Omar Haddad",
            "Frontend developer crafting accessible interfaces with TypeScript and React",
            &["JavaScript", "TypeScript", "React", "CSS"],
            ("Pixel Studio", "2 years"),
        ),
        demo_profile(
            "Lena Fischer",
            "Platform engineer automating Kubernetes clusters with Go and Terraform",
            &["Go", "Kubernetes", "Terraform", "Python"],
            ("Cloudline", "5 years"),
        ),
    ]
}

fn demo_profile(
    name: &str,
    summary: &str,
    skills: &[&str],
    employer: (&str, &str),
) -> ApplicantProfile {
    let handle = name.split_whitespace().next().unwrap_or(name).to_lowercase();
    ApplicantProfile {
        name: name.to_string(),
        email: format!("{handle}@example.com"),
        phone_number: "555-0100".to_string(),
        summary: Some(summary.to_string()),
        skills: skills.iter().map(|skill| skill.to_string()).collect(),
        education: vec![Education {
            degree: "BSc Computer Science".to_string(),
            institution: "State University".to_string(),
        }],
        work_experience: vec![Experience {
            company: employer.0.to_string(),
            duration: employer.1.to_string(),
        }],
        internship_experience: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talent_scout::matching::{CandidateQuery, DuplicatePolicy, MatchSource, SearchConfig};

    #[tokio::test]
    async fn demo_roster_answers_hybrid_queries() {
        let (graph, index) = demo_backend().expect("roster loads");
        let service =
            CandidateSearchService::new(Arc::new(graph), Arc::new(index), SearchConfig::default());

        let ranked = service
            .search(&CandidateQuery {
                query_text: "storage engines in rust".to_string(),
                skills: vec!["rust".to_string()],
            })
            .await
            .expect("search succeeds");

        assert_eq!(ranked[0].applicant_id.as_str(), "Hana Sato");
        assert_eq!(ranked[0].source, MatchSource::Both);
        assert_eq!(ranked.len(), 4);
    }

    #[tokio::test]
    async fn re_added_profile_does_not_duplicate_vector_hits() {
        let (graph, index) = demo_backend().expect("roster loads");
        let mut hana = demo_roster().remove(2);
        hana.summary = Some("Distributed storage engines written in Rust".to_string());
        index.add_applicant(&hana).expect("profile embeds");
        graph.add_applicant(hana);

        let config = SearchConfig {
            duplicates: DuplicatePolicy::Reject,
            ..SearchConfig::default()
        };
        let service = CandidateSearchService::new(Arc::new(graph), Arc::new(index), config);

        let ranked = service
            .search(&CandidateQuery {
                query_text: "storage engines in rust".to_string(),
                skills: vec!["rust".to_string()],
            })
            .await
            .expect("no duplicate applicant in the index");

        let hana_hits = ranked
            .iter()
            .filter(|c| c.applicant_id.as_str() == "Hana Sato")
            .count();
        assert_eq!(hana_hits, 1);
        assert_eq!(ranked.len(), 4);
    }
}
