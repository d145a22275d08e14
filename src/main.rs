//! PLC-KB - Structured Text & Safety Interlock Knowledge Base
//!
//! Thin command-line wrapper around the knowledge base query interface.
//!
//! # Usage
//!
//! ```bash
//! # List categories in source order
//! plc-kb categories
//!
//! # All entries of one category
//! plc-kb category safety
//!
//! # Ranked keyword search
//! plc-kb search EmergencyStop --limit 5
//!
//! # Reference-context block for a prompt builder
//! plc-kb context "how do I debounce a limit switch"
//!
//! # HTTP API with hot reload on source changes
//! plc-kb serve --addr 127.0.0.1:8090
//! ```
//!
//! # Environment Variables
//!
//! - `PLC_KB_CONFIG`: Path to TOML config (default: ./plc_kb.toml)
//! - `PLC_KB_DIR`: Knowledge base directory (overrides `source.dir`)
//! - `PLC_KB_CORS_ORIGINS`: Comma-separated CORS origins for `serve`
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use plc_kb::api::{create_app, ApiState};
use plc_kb::config::KbConfig;
use plc_kb::knowledge_base::watcher;
use plc_kb::{Entry, KnowledgeBaseHandle, SearchHit};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "plc-kb")]
#[command(about = "IEC 61131-3 Structured Text and safety-interlock knowledge base")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides PLC_KB_CONFIG and ./plc_kb.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge base directory (overrides config and PLC_KB_DIR)
    #[arg(long, global = true)]
    kb_dir: Option<PathBuf>,

    /// Print results as JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// List category names in first-seen source order
    Categories,

    /// Show all entries of a category
    Category {
        name: String,
    },

    /// Show all entries carrying a tag (case-insensitive)
    Tag {
        tag: String,
    },

    /// Ranked case-insensitive keyword search over tags and bodies
    Search {
        keyword: String,
        /// Maximum number of hits
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Compose a reference-context block for a free-text question
    Context {
        query: String,
        /// Number of entries to include (default: query.default_top_k)
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show knowledge base statistics
    Stats,

    /// Serve the HTTP API and watch the source directory for changes
    Serve {
        /// Override the server address (default: server.addr)
        #[arg(short, long, value_name = "HOST:PORT")]
        addr: Option<String>,
    },
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<KbConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = KbConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        // load() applies PLC_KB_DIR itself.
        None => KbConfig::load(),
    };
    if let Some(dir) = &args.kb_dir {
        config.source.dir.clone_from(dir);
    }
    Ok(config)
}

// ============================================================================
// Output
// ============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entries(entries: &[&Entry], json: bool) -> Result<()> {
    if json {
        return print_json(&entries);
    }
    for entry in entries {
        println!("[{}] {}", entry.category, entry.body);
        if !entry.tags.is_empty() {
            println!("    tags: {}", entry.tags.join(", "));
        }
    }
    Ok(())
}

fn print_hits(hits: &[SearchHit], json: bool) -> Result<()> {
    if json {
        return print_json(&hits);
    }
    for hit in hits {
        println!(
            "{:>3}  [{}] {}  ({}#{})",
            hit.score, hit.entry.category, hit.entry.body, hit.entry.source, hit.entry.line
        );
    }
    Ok(())
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    KbWatcher,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::KbWatcher => write!(f, "KbWatcher"),
        }
    }
}

// ============================================================================
// Serve
// ============================================================================

async fn run_server(handle: KnowledgeBaseHandle, server_addr: String) -> Result<()> {
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    let watcher_cfg = handle.config().watcher.clone();
    if watcher_cfg.enabled {
        let watcher_handle = handle.clone();
        let watcher_cancel = cancel_token.clone();
        task_set.spawn(async move {
            info!("[KbWatcher] Task starting");
            watcher::run_watcher(
                watcher_handle,
                Duration::from_secs(watcher_cfg.poll_secs),
                watcher_cancel,
            )
            .await;
            Ok(TaskName::KbWatcher)
        });
    } else {
        info!("Knowledge base watcher disabled (watcher.enabled = false)");
    }

    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("🌐 HTTP API listening on http://{}/api/v1", server_addr);

    let app = create_app(ApiState::new(handle));
    let server_cancel = cancel_token.clone();
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;
        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });

    // Supervisor: any task ending brings the others down.
    let mut first_error = None;
    while let Some(joined) = task_set.join_next().await {
        match joined {
            Ok(Ok(name)) => info!("[{}] Task finished", name),
            Ok(Err(e)) => {
                error!("Task failed: {:#}", e);
                first_error.get_or_insert(e);
            }
            Err(e) => {
                error!("Task panicked or was aborted: {}", e);
                first_error.get_or_insert_with(|| anyhow::anyhow!("task join error: {}", e));
            }
        }
        cancel_token.cancel();
    }

    first_error.map_or(Ok(()), Err)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    let server_addr = config.server.addr.clone();

    // Unloaded → Loaded: nothing below runs without a complete knowledge base.
    let handle = KnowledgeBaseHandle::load(config).context("Failed to load knowledge base")?;
    let query = handle.query();

    match args.command {
        SubCommand::Categories => {
            let categories: Vec<&str> = query.list_categories().collect();
            if args.json {
                print_json(&categories)?;
            } else {
                for name in categories {
                    println!("{name}");
                }
            }
        }
        SubCommand::Category { name } => {
            let entries = query.by_category(&name);
            if entries.is_empty() {
                warn!(category = %name, "No entries in category");
            }
            print_entries(&entries, args.json)?;
        }
        SubCommand::Tag { tag } => {
            print_entries(&query.by_tag(&tag), args.json)?;
        }
        SubCommand::Search { keyword, limit } => {
            let hits = query.search_top(&keyword, limit)?;
            print_hits(&hits, args.json)?;
        }
        SubCommand::Context { query: text, top_k } => {
            let context = query.compose_context(&text, top_k)?;
            if args.json {
                print_json(&serde_json::json!({ "context": context }))?;
            } else if context.is_empty() {
                warn!("No matching entries");
            } else {
                println!("{context}");
            }
        }
        SubCommand::Stats => {
            let stats = handle.snapshot().stats();
            if args.json {
                print_json(&stats)?;
            } else {
                println!("documents:  {}", stats.documents);
                println!("entries:    {}", stats.entries);
                println!("categories: {}", stats.categories);
                println!("tags:       {}", stats.tags);
                println!("loaded at:  {}", stats.loaded_at.to_rfc3339());
            }
        }
        SubCommand::Serve { addr } => {
            let addr = addr.unwrap_or(server_addr);
            drop(query);
            run_server(handle, addr).await?;
            info!("✓ PLC-KB shutdown complete");
        }
    }

    Ok(())
}
