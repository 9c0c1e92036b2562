use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hiring_agent::{AgentConfig, FileStore, HttpLanguageModel};
use hiring_pipeline::{
    FinalResult, Orchestrator, ProgressBus, ProgressEvent, ProgressTag, TopCandidateOutcome,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Resume text file
    #[arg(long, required_unless_present = "leaderboard")]
    resume: Option<PathBuf>,

    /// Job description text file
    #[arg(long, required_unless_present = "leaderboard")]
    job: Option<PathBuf>,

    /// Candidate name
    #[arg(long, default_value = "Unknown Candidate")]
    candidate: String,

    /// Job title
    #[arg(long, default_value = "Unknown Position")]
    title: String,

    /// TOML config file layered over the environment defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for evaluation records
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Model name sent to the endpoint
    #[arg(long)]
    model: Option<String>,

    /// Overall deadline for one run, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Skip writing records
    #[arg(long)]
    no_persist: bool,

    /// Print a short summary instead of the full JSON result
    #[arg(long)]
    summary: bool,

    /// List top candidates and exit
    #[arg(long)]
    leaderboard: bool,
}

fn log_event(event: &ProgressEvent) {
    match event.tag {
        ProgressTag::Error => {
            warn!(stage = %event.stage, role = %event.role, "{}", event.message)
        }
        _ => info!(stage = %event.stage, role = %event.role, "{}", event.message),
    }
}

fn print_summary(result: &FinalResult) {
    println!("Candidate: {}", result.candidate_name);
    println!("Position:  {}", result.job_title);
    println!("Status:    {}", result.status);
    println!(
        "Decision:  {} ({:.0}% confidence)",
        result.decision.outcome,
        result.decision.score_percent()
    );
    println!("Summary:   {}", result.decision.reasoning.summary);
    if !result.decision.key_factors.is_empty() {
        println!("Factors:   {}", result.decision.key_factors.join(", "));
    }
    if result.fallbacks_used > 0 {
        println!("Fallbacks: {}", result.fallbacks_used);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = AgentConfig::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }
    if let Some(secs) = args.deadline_secs {
        config.pipeline.deadline_secs = secs;
    }

    let store = FileStore::new(&config.data_dir);

    if args.leaderboard {
        let rows = store
            .top_candidates(hiring_pipeline::TOP_CANDIDATE_MIN_SCORE)
            .await
            .context("Failed to read leaderboard")?;
        for row in rows {
            let r = &row.record;
            println!(
                "{:>5.1}  {}  {}  {}",
                r.overall_score,
                r.candidate_name,
                r.job_title,
                row.created_at.format("%Y-%m-%d")
            );
        }
        return Ok(());
    }

    // Both are present unless --leaderboard was given.
    let resume_path = args.resume.context("--resume is required")?;
    let job_path = args.job.context("--job is required")?;
    let resume_text = tokio::fs::read_to_string(&resume_path)
        .await
        .with_context(|| format!("Failed to read resume {}", resume_path.display()))?;
    let job_description = tokio::fs::read_to_string(&job_path)
        .await
        .with_context(|| format!("Failed to read job description {}", job_path.display()))?;

    if config.llm.api_key.is_none() {
        warn!("HIRING_LLM_API_KEY is not set; every stage will likely fall back");
    }
    info!(
        endpoint = %config.llm.url,
        model = %config.llm.model,
        deadline_secs = config.pipeline.deadline_secs,
        "Hiring agent starting"
    );

    let model = HttpLanguageModel::new(config.llm.clone()).context("Failed to build HTTP client")?;
    let bus = ProgressBus::new().shared();
    let mut events = bus.subscribe();
    let feed = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    log_event(&event);
                    if event.is_terminal() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "Progress feed lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let orchestrator = Orchestrator::new(Arc::new(model))
        .with_notifier(bus.clone())
        .with_config(config.pipeline.clone());

    let outcome = if args.no_persist {
        Ok(orchestrator
            .run(&resume_text, &job_description, &args.candidate, &args.title)
            .await)
    } else {
        orchestrator
            .run_and_persist(
                &resume_text,
                &job_description,
                &args.candidate,
                &args.title,
                &store,
            )
            .await
            .map(|(result, receipt)| {
                info!(evaluation_id = %receipt.evaluation_id, "Evaluation stored");
                if let TopCandidateOutcome::Created(id) = &receipt.top_candidate {
                    info!(top_candidate_id = %id, "Added to top candidates");
                }
                result
            })
    };

    drop(orchestrator);
    drop(bus);
    if let Err(e) = feed.await {
        warn!(error = %e, "Progress feed task failed");
    }

    let (result, persist_error) = match outcome {
        Ok(result) => (result, None),
        Err(e) => {
            error!(error = %e, "Evaluation finished but was not stored");
            let result = e.result().clone();
            (result, Some(e))
        }
    };

    if args.summary {
        print_summary(&result);
    } else {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    }

    match persist_error {
        Some(e) => Err(e).context("Persistence failed"),
        None => Ok(()),
    }
}
