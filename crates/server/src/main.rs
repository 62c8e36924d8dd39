//! PetMind Server
//!
//! Axum server exposing the memory stores and the aggregator, plus one-shot
//! CLI commands for database setup and aggregation.

mod api;

use anyhow::Context;
use clap::{Parser, Subcommand};
use petmind_core::aggregation::{AggregationStrategy, MemoryAggregator, MemorySources};
use petmind_core::config::MemoryConfig;
use petmind_core::state::{AgentState, PetmindDb};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

#[derive(Parser, Clone)]
#[command(author, version, about = "PetMind - conversational memory for a pet-advice agent")]
struct Args {
    /// JSON config file; `PETMIND_*` variables override it
    #[arg(short, long, global = true, default_value = "petmind.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Start the HTTP server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
    /// Create or migrate the database
    Init,
    /// Aggregate memory for one question and print the state as JSON
    Aggregate {
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        question: String,
        /// parallel | sequential
        #[arg(short, long)]
        strategy: Option<AggregationStrategy>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,petmind_core=debug,petmind=debug".into()),
        )
        .with_target(false)
        .init();
}

fn open_db(config: &MemoryConfig) -> anyhow::Result<PetmindDb> {
    PetmindDb::open_at(&config.db_path)
        .with_context(|| format!("Failed to open database at {}", config.db_path))
}

async fn run_server(config: MemoryConfig, port: u16) -> anyhow::Result<()> {
    let db = open_db(&config)?;
    let state = api::AppState::new(&db, config).context("Failed to build memory sources")?;
    let app = api::router(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("PetMind server running at http://{}", addr);
    tracing::info!(
        "Strategy: {}, facts k: {}, collection: {}",
        state.config.strategy,
        state.config.facts_k,
        state.config.collection
    );
    match state.index.count().await {
        Ok(count) => tracing::info!("{} fact documents in '{}'", count, state.index.collection()),
        Err(e) => tracing::warn!("Fact collection unavailable: {}", e),
    }

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_aggregate(
    config: MemoryConfig,
    user: String,
    question: String,
    strategy: Option<AggregationStrategy>,
) -> anyhow::Result<()> {
    let db = open_db(&config)?;
    let sources = MemorySources::sqlite(&db, &config)?;
    let aggregator = MemoryAggregator::new(sources, strategy.unwrap_or(config.strategy))
        .with_facts_k(config.facts_k)
        .with_request_timeout(config.request_timeout());

    let state = aggregator
        .aggregate(AgentState::new(question, user).with_session_store(config.db_path.clone()))
        .await?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = MemoryConfig::resolve(Some(args.config.as_path()))?;

    match args.command {
        Some(CliCommand::Init) => {
            open_db(&config)?;
            println!("Initialized PetMind database at {}", config.db_path);
            Ok(())
        }
        Some(CliCommand::Aggregate {
            user,
            question,
            strategy,
        }) => run_aggregate(config, user, question, strategy).await,
        Some(CliCommand::Serve { port }) => run_server(config, port).await,
        None => run_server(config, 8080).await,
    }
}
