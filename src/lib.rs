use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use textmod_core::services::matching::search_variations;
use textmod_core::{
    AnthropicClient, EngineConfig, InMemorySessionStore, ModificationRequest, ProjectRoot,
    RequestOutcome, TextModEngine, TextReplaceTerms,
};
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout carries only the JSON outcome.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("textmod_core=info,headless_textmod=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .unwrap_or_else(|e| tracing::warn!("failed to set tracing: {}", e));
}

#[derive(Debug, Parser)]
#[command(
    name = "headless-textmod",
    version,
    about = "Apply a natural-language text change to a generated UI project"
)]
pub struct Args {
    /// Project directory; every path stays confined to it.
    #[arg(long)]
    pub root: PathBuf,

    /// The change request, e.g. "change 'Welcome' to 'Hello'".
    #[arg(long, required_unless_present = "search")]
    pub prompt: Option<String>,

    /// Project or conversation summary passed to the classifier.
    #[arg(long)]
    pub context: Option<String>,

    /// JSON file overriding engine settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Compute diffs without writing files.
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub model: Option<String>,

    /// Output token cap for each model call.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub session: Option<String>,

    /// Exact text to replace; skips classification.
    #[arg(long, requires = "replace")]
    pub search: Option<String>,

    #[arg(long, requires = "search")]
    pub replace: Option<String>,
}

/// Runs one request and returns the outcome as pretty JSON.
pub async fn run(args: Args) -> anyhow::Result<String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if args.dry_run {
        config.dry_run = true;
    }

    let root = ProjectRoot::new(&args.root);
    let files = root
        .load_files(&config)
        .await
        .with_context(|| format!("failed to load project {}", root.path().display()))?;

    let mut oracle = AnthropicClient::new()?;
    if let Some(model) = &args.model {
        oracle = oracle.with_model(model);
    }
    if let Some(max_tokens) = args.max_tokens {
        oracle = oracle.with_max_tokens(max_tokens);
    }
    tracing::info!("using model {}", oracle.model());

    let engine = TextModEngine::new(Arc::new(oracle), config)
        .with_workspace(root)
        .with_session_store(Arc::new(InMemorySessionStore::new()));

    let mut request = ModificationRequest::new(args.prompt.clone().unwrap_or_default(), files);
    request.context_summary = args.context.clone();
    request.session_id = args.session.clone();

    let outcome = match (&args.search, &args.replace) {
        (Some(search), Some(replace)) => {
            let terms = TextReplaceTerms {
                search_term: search.clone(),
                replacement_term: replace.clone(),
                search_variations: search_variations(search),
            };
            RequestOutcome::TextReplaced {
                result: engine.run_text_replace(&request, &terms).await,
            }
        }
        _ => engine.handle_request(&request).await,
    };

    Ok(serde_json::to_string_pretty(&outcome)?)
}
