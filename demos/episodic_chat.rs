//! # Episodic Chat
//!
//! Interactive chat over stdin with an agent that remembers earlier
//! conversations by topic.
//!
//! ## Run This Demo
//!
//! ```bash
//! cargo run --bin episodic_chat -- --config episodic.toml --snapshot memory.json
//! ```
//!
//! Commands: `/memory` dumps the episode store, `/reset` forgets the current
//! transcript, `/quit` exits (saving the snapshot when one was given).
//!
//! Oracles are configured through the TOML file and `EPISODIC_*` environment
//! variables (e.g. `EPISODIC_BASE_URL`, `EPISODIC_CHAT_MODEL`).

use anyhow::Context;
use clap::Parser;
use episodic_llm::LlmConfig;
use episodic_memory::agent::memory::{describe_store, EpisodicMemoryConfig, InMemoryEpisodicStore};
use episodic_memory::agent::{AgentConfig, EpisodicAgent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "episodic_chat", about = "Chat with an agent that has episodic memory")]
struct Args {
    /// TOML file with oracle settings
    #[arg(short, long, env = "EPISODIC_CONFIG")]
    config: Option<PathBuf>,

    /// JSON snapshot restored at start and written on exit
    #[arg(short, long)]
    snapshot: Option<PathBuf>,

    /// Episodes recalled per turn
    #[arg(short, long, default_value_t = 3)]
    k: usize,

    /// Similarity above which episodes are merged
    #[arg(long, default_value_t = 0.9)]
    merge_threshold: f32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,episodic_memory=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let llm_config = LlmConfig::load(args.config.as_ref()).context("loading oracle configuration")?;
    let memory_config = EpisodicMemoryConfig::default()
        .with_k(args.k)
        .with_merge_threshold(args.merge_threshold);

    let mut agent_config = AgentConfig::default().with_temperature(llm_config.temperature);
    if let Some(max_tokens) = llm_config.max_tokens {
        agent_config = agent_config.with_max_tokens(max_tokens);
    }

    let mut agent = EpisodicAgent::from_config(
        &llm_config,
        Arc::new(InMemoryEpisodicStore::new()),
        memory_config,
        agent_config,
    )?;

    if let Some(path) = args.snapshot.as_ref().filter(|p| p.exists()) {
        agent
            .memory_mut()
            .load_snapshot(path)
            .await
            .with_context(|| format!("restoring {}", path.display()))?;
        info!(path = %path.display(), "Memory restored");
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"Human: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                agent.reset();
                stdout.write_all(b"(transcript cleared)\n").await?;
            }
            "/memory" => {
                let dump = describe_store(agent.memory().store().as_ref()).await?;
                stdout.write_all(dump.as_bytes()).await?;
            }
            _ => match agent.run(input).await {
                Ok(reply) => {
                    stdout.write_all(format!("AI: {reply}\n").as_bytes()).await?;
                }
                Err(e) => {
                    tracing::error!(error = %e, retryable = e.is_retryable(), "Turn failed");
                    stdout.write_all(b"(no answer, see log)\n").await?;
                }
            },
        }
    }

    if let Some(path) = &args.snapshot {
        agent
            .memory()
            .save_snapshot(path)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Memory saved");
    }

    Ok(())
}
