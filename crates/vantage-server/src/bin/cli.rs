//! Vantage CLI
//!
//! Command-line front end driving the query engine directly, without
//! going through the HTTP transport — for local inspection and ad hoc
//! indexing, the way the teacher's `vestige` binary drove `Storage`
//! directly for `stats`/`health`/`consolidate`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use vantage_core::orchestrator::Request;
use vantage_core::ports::default::{HttpLlm, HttpLlmConfig};
use vantage_core::{EngineConfig, Event, Services};

#[derive(Parser)]
#[command(name = "vantage")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Vantage query engine")]
struct Cli {
    /// Data directory for the relational/vector/lexical stores.
    #[arg(long, global = true, env = "VANTAGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Base URL of an OpenAI-chat-completions-compatible LLM endpoint.
    #[arg(long, global = true, env = "VANTAGE_LLM_BASE_URL", default_value = "http://127.0.0.1:11434/v1")]
    llm_base_url: String,

    #[arg(long, global = true, env = "VANTAGE_LLM_MODEL", default_value = "llama3")]
    llm_model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query through the orchestrator and print the answer.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Index every allowed file under a directory.
    Index { path: PathBuf },
    /// Print a reachability summary for every injected port.
    Health,
    /// List indexed documents.
    Documents {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_target(false).init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| {
        directories::ProjectDirs::from("dev", "vantage", "vantage").map(|d| d.data_dir().to_path_buf()).unwrap_or_else(|| PathBuf::from(".vantage"))
    });
    std::fs::create_dir_all(&data_dir)?;

    let llm_config = HttpLlmConfig { base_url: cli.llm_base_url.clone(), api_key: None, model: cli.llm_model.clone(), timeout: std::time::Duration::from_secs(30) };
    let llm = Arc::new(HttpLlm::new(llm_config));
    let services = Services::bootstrap(EngineConfig::default(), &data_dir, llm)?;

    match cli.command {
        Commands::Search { query, top_k, session_id } => run_search(&services, query, top_k, session_id).await,
        Commands::Index { path } => run_index(&services, path).await,
        Commands::Health => run_health(&services).await,
        Commands::Documents { limit } => run_documents(&services, limit).await,
    }
}

async fn run_search(services: &Services, query: String, top_k: usize, session_id: Option<String>) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(64);
    let request = Request { request_id: uuid::Uuid::new_v4().to_string(), query, user_id: None, session_id, attached_documents: Vec::new(), filters: Default::default(), top_k };

    let driver = services.driver.clone();
    let handle = tokio::spawn(async move { driver.process(request, tx, CancellationToken::new()).await });

    while let Some(event) = rx.recv().await {
        if let Event::Step { stage, action, .. } = &event {
            println!("{} {} {}", "-->".dimmed(), stage.cyan(), action);
        }
    }

    let result = handle.await??;
    println!();
    println!("{}", result.response);
    println!();
    println!("{}: {:.2}", "confidence".white().bold(), result.confidence);
    println!("{}: {}", "results".white().bold(), result.results.len());
    Ok(())
}

async fn run_index(services: &Services, path: PathBuf) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(64);
    let ingestion = services.ingestion.clone();
    let handle = tokio::spawn(async move { ingestion.ingest(&path, tx).await });

    while let Some(progress) = rx.recv().await {
        println!("{} {}/{} {}", "indexing".cyan(), progress.position + 1, progress.total, progress.current_file);
    }

    let report = handle.await?;
    println!();
    println!("{}: {}", "indexed".green().bold(), report.success);
    println!("{}: {}", "skipped".yellow().bold(), report.skipped);
    println!("{}: {}", "failed".red().bold(), report.failed);
    Ok(())
}

async fn run_health(services: &Services) -> anyhow::Result<()> {
    println!("{}", "=== Vantage Health Check ===".cyan().bold());
    println!("{}: {}", "vector_store dim".white(), services.vector_store.dim());
    println!("{}: {}", "embedder dim".white(), services.embedder.dim());
    println!(
        "{}: {}",
        "reranker".white(),
        if services.reranker.as_ref().map(|r| r.is_available()).unwrap_or(false) { "available".green() } else { "disabled".yellow() }
    );
    match services.relational.get_document("__health__").await {
        Ok(_) => println!("{}: {}", "relational store".white(), "reachable".green()),
        Err(e) => println!("{}: {} ({e})", "relational store".white(), "unreachable".red()),
    }
    Ok(())
}

async fn run_documents(services: &Services, limit: usize) -> anyhow::Result<()> {
    let documents = services.relational.list_documents(&Default::default(), limit, 0).await?;
    for doc in &documents {
        println!("{:<20} {:<10} {}", doc.id.dimmed(), doc.doc_type, doc.filename);
    }
    println!();
    println!("{}: {}", "total".white().bold(), documents.len());
    Ok(())
}
