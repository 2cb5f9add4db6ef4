use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_client::OpenAi;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use rankwise_common::{Config, ReviewAction};
use rankwise_seo::generators::MetaDescriptionRequest;
use rankwise_seo::retrieval::{QdrantStore, SerperRetriever};
use rankwise_seo::{Ledger, LedgerSnapshot, PageContext, PipelineSettings, SeoContext, SeoPipeline};

#[derive(Parser)]
#[command(name = "seo-cycle", about = "Rankwise SEO analysis and remediation cycle")]
struct Cli {
    /// JSON file holding the change log and audit issues between runs
    #[arg(long, global = true, default_value = "./seo-ledger.json")]
    ledger: PathBuf,

    /// Emit logs as JSON lines instead of human-readable text
    #[arg(long, global = true, env = "RANKWISE_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a context file of documents and print the cycle report
    Cycle {
        /// JSON file with site_documents, competitor_documents, new_scraped_content
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// Diagnose a page's metrics and propose remediations
    Anomaly {
        #[arg(long)]
        page_id: String,
        #[arg(long)]
        topic: String,
        /// File containing the page content
        #[arg(long)]
        content: PathBuf,
        #[arg(long)]
        metrics: String,
        #[arg(long, default_value = "")]
        competitor_insights: String,
        #[arg(long, default_value = "")]
        recent_changes: String,
    },
    /// Propose a rewritten meta description
    Meta {
        #[arg(long)]
        page_id: String,
        /// File containing the page content
        #[arg(long)]
        content: PathBuf,
        #[arg(long, default_value = "")]
        current: String,
        #[arg(long, default_value = "")]
        keywords: String,
    },
    /// Approve or reject a pending change
    Review {
        #[arg(long)]
        id: Uuid,
        #[arg(long, value_enum)]
        action: ReviewArg,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReviewArg {
    Approve,
    Reject,
}

impl From<ReviewArg> for ReviewAction {
    fn from(arg: ReviewArg) -> Self {
        match arg {
            ReviewArg::Approve => ReviewAction::Approve,
            ReviewArg::Reject => ReviewAction::Reject,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json_logs)?;

    let ledger = Arc::new(load_ledger(&cli.ledger)?);

    match cli.command {
        // Reviews touch only the ledger; no model or store needed.
        Command::Review {
            id,
            action,
            actor,
            notes,
        } => {
            let entry = ledger.review(id, action.into(), &actor, notes)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Command::Cycle { context } => {
            let context: SeoContext = match context {
                Some(path) => serde_json::from_str(&read(&path)?)
                    .with_context(|| format!("Invalid context file {}", path.display()))?,
                None => SeoContext::default(),
            };
            let report = build_pipeline(ledger.clone())?.process_cycle(&context).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Anomaly {
            page_id,
            topic,
            content,
            metrics,
            competitor_insights,
            recent_changes,
        } => {
            let page = PageContext {
                page_id,
                page_content: read(&content)?,
                topic,
                competitor_insights,
            };
            let pipeline = build_pipeline(ledger.clone())?;
            let analysis = pipeline.run_anomaly_workflow(&page, &metrics, &recent_changes).await;
            // Records made before an abort are kept.
            save_ledger(&cli.ledger, &ledger)?;
            println!("{}", serde_json::to_string_pretty(&analysis?)?);
        }
        Command::Meta {
            page_id,
            content,
            current,
            keywords,
        } => {
            let request = MetaDescriptionRequest {
                page_content: read(&content)?,
                current_description: current,
                target_keywords: keywords,
            };
            let id = build_pipeline(ledger.clone())?
                .generate_meta_description(&page_id, &request)
                .await?;
            if let Some(entry) = ledger.get(id) {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
        }
    }

    save_ledger(&cli.ledger, &ledger)?;
    info!(path = %cli.ledger.display(), "Ledger saved");
    Ok(())
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("rankwise=info".parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn build_pipeline(ledger: Arc<Ledger>) -> Result<SeoPipeline> {
    let config = Config::from_env()?;
    config.log_redacted();

    let mut openai = OpenAi::new(&config.openai_api_key, &config.llm_model)
        .with_embedding_model(&config.embeddings_model);
    if let Some(base_url) = &config.openai_base_url {
        openai = openai.with_base_url(base_url);
    }
    let openai = Arc::new(openai);

    let store = QdrantStore::new(&config.qdrant_url, config.qdrant_api_key.clone(), openai.clone())?;
    let search = SerperRetriever::new(config.serper_api_key.clone(), 3)?;

    Ok(SeoPipeline::new(openai, Arc::new(store), PipelineSettings::from_config(&config))
        .with_search(Arc::new(search))
        .with_ledger(ledger))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_ledger(path: &Path) -> Result<Ledger> {
    if !path.exists() {
        return Ok(Ledger::new());
    }
    let snapshot: LedgerSnapshot = serde_json::from_str(&read(path)?)
        .with_context(|| format!("Invalid ledger file {}", path.display()))?;
    info!(
        changes = snapshot.change_log.len(),
        issues = snapshot.audit_issues.len(),
        "Ledger loaded"
    );
    Ok(Ledger::from_snapshot(snapshot))
}

fn save_ledger(path: &Path, ledger: &Ledger) -> Result<()> {
    let json = serde_json::to_string_pretty(&ledger.snapshot())?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_logs_flag_is_global() {
        let cli = Cli::try_parse_from(["seo-cycle", "cycle", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Command::Cycle { context: None }));

        let cli = Cli::try_parse_from(["seo-cycle", "--ledger", "l.json", "cycle"]).unwrap();
        assert!(!cli.json_logs);
        assert_eq!(cli.ledger, PathBuf::from("l.json"));
    }

    #[test]
    fn review_parses_action() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "seo-cycle", "review", "--id", id.as_str(), "--action", "reject", "--actor", "dana",
        ])
        .unwrap();
        match cli.command {
            Command::Review { action, actor, notes, .. } => {
                assert_eq!(ReviewAction::from(action), ReviewAction::Reject);
                assert_eq!(actor, "dana");
                assert!(notes.is_none());
            }
            _ => panic!("expected review"),
        }
    }
}
