//! # Second Brain CLI (`brain`)
//!
//! ## Usage
//!
//! ```bash
//! brain --config ./config/brain.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `brain init` | Create the local index and the documents folder |
//! | `brain sync` | Import documents changed since the last sync |
//! | `brain query "<question>"` | One-shot answer from the knowledge base |
//! | `brain rag` | Interactive session grounded in the knowledge base |
//! | `brain llm` | Interactive session with the model alone |
//! | `brain tree` | Passages retrieved by the last query |
//! | `brain list` | Documents in the folder and whether they are synced |
//! | `brain status` | Configuration and sync overview |
//! | `brain completions <shell>` | Print a shell completion script |
//!
//! Logs go to stderr; set `RUST_LOG` (e.g. `RUST_LOG=second_brain=debug`)
//! to see per-document and per-request detail.

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use second_brain::chat::{run_chat, ChatStats, DirectTurn, RagTurn};
use second_brain::config::{self, Config};
use second_brain::generation::GenerationRouter;
use second_brain::kb_sqlite::SqliteKnowledgeBase;
use second_brain::knowledge;
use second_brain::pipeline::QueryPipeline;
use second_brain::progress::ProgressMode;
use second_brain::query::{run_query, QueryOptions};
use second_brain::results::{run_tree, store_for};
use second_brain::retrieval::RetrievalClient;
use second_brain::status::{run_list, run_status};
use second_brain::sync::run_sync;

/// Second Brain: sync a document folder into a knowledge base and ask it
/// questions.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/brain.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "brain",
    about = "Sync a document folder into a knowledge base and ask it questions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/brain.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local index and the documents folder.
    ///
    /// Safe to run more than once.
    Init,

    /// Import documents added or changed since the last sync.
    ///
    /// The last-sync timestamp only advances when at least one document was
    /// imported, so a failed batch is retried on the next run.
    Sync {
        /// Folder to scan instead of `[documents].folder`.
        #[arg(long)]
        folder: Option<PathBuf>,

        /// Import every document and leave the last-sync timestamp untouched.
        #[arg(long)]
        force: bool,

        /// Show what would be imported without touching the knowledge base.
        #[arg(long)]
        dry_run: bool,

        /// Use this date (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS) instead of the
        /// stored last-sync timestamp.
        #[arg(long)]
        since: Option<String>,

        /// Progress output: `off`, `human` or `json` (stderr). Defaults to
        /// `human` on a terminal.
        #[arg(long, value_parser = parse_progress)]
        progress: Option<ProgressMode>,
    },

    /// Ask one question.
    Query {
        question: String,

        /// Number of documents to retrieve.
        #[arg(long)]
        limit: Option<usize>,

        /// List the documents the answer drew on.
        #[arg(long)]
        sources: bool,

        /// Show retrieved passages only; do not call the model.
        #[arg(long)]
        no_llm: bool,

        /// Override the configured model.
        #[arg(long)]
        model: Option<String>,
    },

    /// Interactive questions over the knowledge base.
    Rag {
        /// Keep conversation history between questions.
        #[arg(long)]
        history: bool,

        /// Number of past turns sent with each question.
        #[arg(long)]
        context: Option<usize>,

        /// Override the configured model.
        #[arg(long)]
        model: Option<String>,
    },

    /// Interactive chat with the model, without retrieval.
    Llm {
        /// Keep conversation history between messages.
        #[arg(long)]
        history: bool,

        /// Number of past turns sent with each message.
        #[arg(long)]
        context: Option<usize>,

        /// Override the configured chat model.
        #[arg(long)]
        model: Option<String>,
    },

    /// Show the passages retrieved by the last query.
    Tree,

    /// List documents in the folder and whether they are synced.
    List,

    /// Show configuration, index and sync status.
    Status,

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_progress(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("invalid progress mode '{}'", s))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("second_brain=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "brain", &mut io::stdout());
        return Ok(());
    }

    init_logging();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cfg).await?,
        Commands::Sync {
            folder,
            force,
            dry_run,
            since,
            progress,
        } => {
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            run_sync(&cfg, folder, force, dry_run, since, progress).await?;
        }
        Commands::Query {
            question,
            limit,
            sources,
            no_llm,
            model,
        } => {
            let options = QueryOptions {
                limit,
                sources,
                no_llm,
                model,
            };
            run_query(&cfg, &question, options).await?;
        }
        Commands::Rag {
            history,
            context,
            model,
        } => {
            let window = context.unwrap_or(cfg.chat.context);
            run_rag(&cfg, history, window, model).await?;
        }
        Commands::Llm {
            history,
            context,
            model,
        } => {
            let window = context.unwrap_or(cfg.chat.context);
            run_llm(&cfg, history, window, model).await?;
        }
        Commands::Tree => run_tree(&cfg)?,
        Commands::List => run_list(&cfg)?,
        Commands::Status => run_status(&cfg).await?,
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

async fn run_init(cfg: &Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cfg.documents.folder)?;
    let kb = &cfg.knowledge_base;
    if kb.backend == "http" {
        println!(
            "Using remote knowledge base at {}; nothing to initialize.",
            kb.endpoint.as_deref().unwrap_or_default()
        );
    } else {
        let store = SqliteKnowledgeBase::open(&kb.db_path, kb.index.clone(), kb.max_tokens).await?;
        store.close().await;
        println!("Knowledge base initialized at {}", kb.db_path.display());
    }
    println!("Documents folder: {}", cfg.documents.folder.display());
    Ok(())
}

async fn run_rag(
    cfg: &Config,
    history: bool,
    window: usize,
    model: Option<String>,
) -> anyhow::Result<()> {
    let kb = knowledge::open(cfg).await?;
    let router = GenerationRouter::from_config(cfg)?;
    let retrieval = RetrievalClient::new(
        kb.as_ref(),
        cfg.knowledge_base.index.clone(),
        cfg.knowledge_base.limit,
        cfg.knowledge_base.min_relevance,
    );
    let pipeline = QueryPipeline::new(retrieval, &router);
    let store = store_for(cfg);
    let turn = RagTurn {
        pipeline: &pipeline,
        store: &store,
        window,
        model,
    };

    println!(
        "Ask about your documents ({} mode). Empty line or `exit` to quit.",
        router.provider().mode()
    );
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stats = run_chat(stdin, &mut io::stdout(), &turn, history, window).await?;
    print_session_summary(&stats);
    Ok(())
}

async fn run_llm(
    cfg: &Config,
    history: bool,
    window: usize,
    model: Option<String>,
) -> anyhow::Result<()> {
    let router = GenerationRouter::from_config(cfg)?;
    let model = if cfg.generation.is_hosted() {
        router.resolve_model(model.as_deref())
    } else {
        model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| cfg.generation.local.chat_model.clone())
    };
    let turn = DirectTurn {
        router: &router,
        window,
        model,
    };

    println!("Chat with {}. Empty line or `exit` to quit.", turn.model);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stats = run_chat(stdin, &mut io::stdout(), &turn, history, window).await?;
    print_session_summary(&stats);
    Ok(())
}

fn print_session_summary(stats: &ChatStats) {
    if stats.failed > 0 || stats.cancelled > 0 {
        eprintln!(
            "{} answered, {} failed, {} cancelled",
            stats.answered, stats.failed, stats.cancelled
        );
    }
}
