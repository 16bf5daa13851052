//! Talent Ranking Service - command line entry point
//!
//! Runs one analysis over a candidate pool loaded from a JSON file and prints
//! the report to stdout.
//!
//! ```text
//! talent-ranking-service --pool candidates.json --request request.json
//! ```

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use talent_ranking_service::{
    AnalysisPipeline, AnalysisRequest, Candidate, Config, InMemoryCandidateStore,
    ScoringCollaborator,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "talent_ranking_service=info,resilience=info";

#[derive(Debug)]
struct Args {
    pool: PathBuf,
    request: PathBuf,
}

impl Args {
    fn from_args() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        let mut pool = None;
        let mut request = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--pool" if i + 1 < args.len() => {
                    pool = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
                "--request" if i + 1 < args.len() => {
                    request = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
                other => warn!("Ignoring unknown argument '{}'", other),
            }
            i += 1;
        }

        match (pool, request) {
            (Some(pool), Some(request)) => Ok(Self { pool, request }),
            _ => bail!("usage: talent-ranking-service --pool <candidates.json> --request <request.json>"),
        }
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let json = env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::from_args()?;

    let config = Config::from_env().context("Failed to load configuration")?;

    let candidates: Vec<Candidate> = read_json(&args.pool)?;
    let request: AnalysisRequest = read_json(&args.request)?;

    info!(
        candidates = candidates.len(),
        role_id = %request.role_id,
        "Loaded candidate pool"
    );

    let collaborator = ScoringCollaborator::from_config(&config.llm);
    let store = Arc::new(InMemoryCandidateStore::with_candidates(candidates));
    let pipeline = AnalysisPipeline::new(store, collaborator, &config);

    let report = pipeline.run(request).await.context("Analysis failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
