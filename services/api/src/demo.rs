use crate::infra::{build_search_service, demo_backend, demo_roster};
use clap::Args;
use std::num::NonZeroUsize;
use std::sync::Arc;
use talent_scout::config::AppConfig;
use talent_scout::error::AppError;
use talent_scout::matching::{
    ApplicantId, CandidateGraph, CandidateQuery, CandidateSearchService, RankedCandidate,
    SearchConfig, VectorIndex,
};

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Free-text description of the role, matched against profile embeddings
    #[arg(long)]
    pub(crate) query: String,
    /// Required skill; repeat the flag for several skills
    #[arg(long = "skill")]
    pub(crate) skills: Vec<String>,
    /// Override the configured number of similarity results
    #[arg(long)]
    pub(crate) top_k: Option<NonZeroUsize>,
    /// Print the ranked list as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of similarity results per query
    #[arg(long)]
    pub(crate) top_k: Option<NonZeroUsize>,
    /// Print the relations of the best candidate for each query
    #[arg(long)]
    pub(crate) show_relations: bool,
}

const DEMO_QUERIES: [(&str, &[&str]); 3] = [
    ("backend payments engineer", &["java", "sql"]),
    ("machine learning with python", &["python"]),
    ("storage engines in rust", &[]),
];

pub(crate) async fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let SearchArgs {
        query,
        skills,
        top_k,
        json,
    } = args;

    let mut config = AppConfig::load()?;
    if let Some(top_k) = top_k {
        config.search.semantic.top_k = top_k;
    }

    let service = build_search_service(&config)?;
    let ranked = service
        .search(&CandidateQuery {
            query_text: query,
            skills,
        })
        .await?;

    if json {
        match serde_json::to_string_pretty(&ranked) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Ranked payload unavailable: {err}"),
        }
    } else {
        render_ranking(&ranked);
    }

    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        top_k,
        show_relations,
    } = args;

    let mut config = SearchConfig::default();
    if let Some(top_k) = top_k {
        config.semantic.top_k = top_k;
    }

    let (graph, index) = demo_backend()?;
    let service = CandidateSearchService::new(Arc::new(graph), Arc::new(index), config);

    println!("Hybrid candidate search demo");
    println!("Roster:");
    for profile in demo_roster() {
        println!("  - {} [{}]", profile.name, profile.skills.join(", "));
    }

    for (query_text, skills) in DEMO_QUERIES {
        println!("\nQuery: \"{query_text}\" | skills: {}", skills.join(", "));
        let query = CandidateQuery {
            query_text: query_text.to_string(),
            skills: skills.iter().map(|skill| skill.to_string()).collect(),
        };

        let ranked = match service.search(&query).await {
            Ok(ranked) => ranked,
            Err(err) => {
                println!("  Search failed: {err}");
                continue;
            }
        };
        render_ranking(&ranked);

        if !show_relations {
            continue;
        }
        if let Some(best) = ranked.first() {
            render_relations(&service, &best.applicant_id).await;
        }
    }

    Ok(())
}

fn render_ranking(ranked: &[RankedCandidate]) {
    if ranked.is_empty() {
        println!("  No candidates matched");
        return;
    }

    for (position, candidate) in ranked.iter().enumerate() {
        let skills = if candidate.matched_skills.is_empty() {
            "-".to_string()
        } else {
            candidate.matched_skills.join(", ")
        };
        println!(
            "  {:>2}. {:<16} {:<7} matched: {}",
            position + 1,
            candidate.applicant_id.as_str(),
            candidate.source.label(),
            skills
        );
    }
}

async fn render_relations<G, V>(service: &CandidateSearchService<G, V>, applicant: &ApplicantId)
where
    G: CandidateGraph + ?Sized,
    V: VectorIndex + ?Sized,
{
    match service.applicant(applicant).await {
        Ok(relations) => {
            println!("  Relations of {applicant}:");
            for relation in relations {
                let target = relation
                    .properties
                    .values()
                    .filter_map(|value| value.as_str())
                    .collect::<Vec<_>>()
                    .join(" @ ");
                println!(
                    "    - {} -> {}:{}",
                    relation.relationship,
                    relation.node_labels.join(":"),
                    target
                );
            }
        }
        Err(err) => println!("  Relations unavailable: {err}"),
    }
}
