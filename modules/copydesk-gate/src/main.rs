use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use copydesk_common::{load_templates, load_verticals, Draft, Source};
use copydesk_gate::{EditorialGate, InMemoryDecisionLog};
use copydesk_policy::cadence::CadenceTracker;
use copydesk_policy::registry::{reference_verticals, VerticalPolicyRegistry};
use copydesk_policy::templates::{reference_templates, TemplateRegistry};
use copydesk_scoring::{ScoringRules, SourceQualityScorer};

#[derive(Parser)]
#[command(name = "gate", about = "Copydesk editorial admission gate")]
struct Args {
    /// Draft JSON file to evaluate
    #[arg(long)]
    draft: PathBuf,

    /// Resolved sources JSON file (defaults to an empty batch)
    #[arg(long)]
    sources: Option<PathBuf>,

    /// Verticals TOML (defaults to the built-in reference set)
    #[arg(long)]
    verticals: Option<PathBuf>,

    /// Publication templates TOML (defaults to the built-in reference set)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Scoring rules TOML (defaults to the built-in rules)
    #[arg(long)]
    rules: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("copydesk=info".parse()?))
        .init();

    info!("Copydesk gate starting...");

    let args = Args::parse();

    let verticals = match &args.verticals {
        Some(path) => load_verticals(path)?,
        None => reference_verticals(),
    };
    let templates = match &args.templates {
        Some(path) => load_templates(path)?,
        None => reference_templates(),
    };
    let rules = match &args.rules {
        Some(path) => copydesk_scoring::rules::load_rules(path)?,
        None => ScoringRules::default(),
    };

    let draft_json = std::fs::read_to_string(&args.draft)
        .with_context(|| format!("Failed to read draft: {}", args.draft.display()))?;
    let draft: Draft = serde_json::from_str(&draft_json)
        .with_context(|| format!("Failed to parse draft: {}", args.draft.display()))?;

    let sources: Vec<Source> = match &args.sources {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read sources: {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse sources: {}", path.display()))?
        }
        None => Vec::new(),
    };

    info!(
        draft_id = %draft.id,
        vertical = draft.vertical.as_str(),
        publication_type = draft.publication_type.as_str(),
        sources = sources.len(),
        "Evaluating draft"
    );

    let gate = EditorialGate::new(
        SourceQualityScorer::new(rules),
        Arc::new(VerticalPolicyRegistry::new(verticals)),
        Arc::new(TemplateRegistry::new(templates)),
        Arc::new(CadenceTracker::in_memory()),
        Arc::new(InMemoryDecisionLog::default()),
    );

    let decision = gate.evaluate(&draft, &sources, Utc::now());

    info!(outcome = ?decision.outcome, "Evaluation complete");
    println!("{}", serde_json::to_string_pretty(&decision)?);

    Ok(())
}
