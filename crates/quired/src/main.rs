//! `quired`: the Quire log daemon.
//!
//! Binary entrypoint that ties the checkpoint store, the log engine and the
//! HTTP front-end together into a running log.
//!
//! # Usage
//!
//! ```text
//! quired start                            # serve a test log under /tmp/log
//! quired start -c quire.toml              # start with a config file
//! quired start -d ./log -l 127.0.0.1:8080 # override root and address
//! quired keygen example.com/log           # print a fresh key pair
//! quired verify -d ./log                  # check the stored checkpoint
//! ```

mod config;
mod stats;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use quire_engine::merkle::empty_root;
use quire_engine::{FileEntryStore, LogEngine};
use quire_http::{Latency, LogServer, LogServerConfig};
use quire_note::{NoteSigner, NoteVerifier};
use quire_store::{CheckpointStore, FileStore, SignedTreeState, parse_and_verify};
use tokio::sync::watch;
use tracing::{info, warn};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "quired", version, about = "Quire transparency log daemon")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start serving the log.
    Start {
        /// Override the log root directory.
        #[arg(short = 'd', long)]
        path: Option<PathBuf>,

        /// Override the HTTP listen address (e.g. "127.0.0.1:2024").
        #[arg(short = 'l', long)]
        listen_addr: Option<String>,

        /// Entries per batch.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Longest an entry waits for its batch to fill, in milliseconds.
        #[arg(long)]
        batch_max_age_ms: Option<u64>,

        /// Note signer key for checkpoints.
        #[arg(long, env = "QUIRE_SIGNER", hide_env_values = true)]
        signer: Option<String>,

        /// Note verifier key for checkpoints.
        #[arg(long, env = "QUIRE_VERIFIER")]
        verifier: Option<String>,
    },

    /// Generate a new signer/verifier key pair for a log origin.
    Keygen {
        /// Key name; becomes the log origin.
        name: String,
    },

    /// Verify the stored checkpoint and print its contents.
    Verify {
        /// Override the log root directory.
        #[arg(short = 'd', long)]
        path: Option<PathBuf>,

        /// Note verifier key for checkpoints.
        #[arg(long, env = "QUIRE_VERIFIER")]
        verifier: Option<String>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    match cli.command {
        Commands::Start {
            path,
            listen_addr,
            batch_size,
            batch_max_age_ms,
            signer,
            verifier,
        } => {
            // CLI args override config file values.
            if let Some(path) = path {
                config.storage.path = path;
            }
            if let Some(addr) = listen_addr {
                config.server.listen_addr = addr;
            }
            if let Some(n) = batch_size {
                config.storage.batch_size = n;
            }
            if let Some(ms) = batch_max_age_ms {
                config.storage.batch_max_age_ms = ms;
            }
            if let Some(s) = signer {
                config.keys.signer = s;
            }
            if let Some(v) = verifier {
                config.keys.verifier = v;
            }
            cmd_start(config).await
        }
        Commands::Keygen { name } => cmd_keygen(&name),
        Commands::Verify { path, verifier } => {
            if let Some(path) = path {
                config.storage.path = path;
            }
            if let Some(v) = verifier {
                config.keys.verifier = v;
            }
            cmd_verify(&config).await
        }
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// -----------------------------------------------------------------------
// quired start
// -----------------------------------------------------------------------

async fn cmd_start(config: CliConfig) -> Result<()> {
    info!("starting quired");
    info!(
        path = %config.storage.path.display(),
        addr = %config.server.listen_addr,
        batch_size = config.storage.batch_size,
        batch_max_age_ms = config.storage.batch_max_age_ms,
        "log configuration"
    );

    // --- Keys ---
    let signer = NoteSigner::parse(&config.keys.signer).context("invalid signer key")?;
    let verifier = NoteVerifier::parse(&config.keys.verifier).context("invalid verifier key")?;
    if config.uses_default_keys() {
        warn!("using the built-in test signing key; configure [keys] for a real log");
    }
    info!(origin = signer.name(), key_hash = %format!("{:08x}", signer.key_hash()), "log identity");

    // --- Checkpoint ---
    let store = FileStore::new(&config.storage.path).context("failed to create log root")?;
    let tree = Arc::new(
        SignedTreeState::new(store, signer, verifier)
            .context("signer and verifier keys do not match")?,
    );
    let head = tree
        .initialize(&empty_root())
        .await
        .context("failed to load or initialize checkpoint")?;
    info!(size = head.size, hash = %hex::encode(&head.hash), "checkpoint ready");

    // --- Engine ---
    let entries = Arc::new(
        FileEntryStore::new(&config.storage.path).context("failed to create entry store")?,
    );
    let engine = Arc::new(
        LogEngine::open(entries, tree.clone(), config.engine_config())
            .await
            .context("failed to open log engine")?,
    );

    // --- Shutdown signal ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // --- Stats ---
    let latency = Arc::new(Latency::new());
    let stats_task = tokio::spawn(stats::run_stats(
        tree.clone(),
        latency.clone(),
        config.stats_interval(),
        shutdown_rx.clone(),
    ));

    // --- HTTP API ---
    let server = LogServer::new(LogServerConfig {
        sequencer: engine.clone(),
        latency,
        root: config.storage.path.clone(),
        max_body_bytes: config.server.max_body_bytes,
    });
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_addr))?;

    let mut server_shutdown = shutdown_rx;
    server
        .serve(listener, async move {
            let _ = server_shutdown.changed().await;
        })
        .await
        .context("HTTP server failed")?;

    // Flush anything still batched before exiting.
    info!("flushing log engine");
    engine.shutdown().await;
    if let Err(e) = stats_task.await {
        warn!(error = %e, "stats task failed");
    }

    info!("quired stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

// -----------------------------------------------------------------------
// quired keygen
// -----------------------------------------------------------------------

fn cmd_keygen(name: &str) -> Result<()> {
    let (signer, verifier) =
        quire_note::generate_key(name).with_context(|| format!("cannot generate key for {name:?}"))?;
    println!("signer   = \"{signer}\"");
    println!("verifier = \"{verifier}\"");
    Ok(())
}

// -----------------------------------------------------------------------
// quired verify
// -----------------------------------------------------------------------

async fn cmd_verify(config: &CliConfig) -> Result<()> {
    let verifier = NoteVerifier::parse(&config.keys.verifier).context("invalid verifier key")?;
    let store = FileStore::new(&config.storage.path).context("failed to open log root")?;

    let bytes = store
        .read_checkpoint()
        .await
        .context("failed to read checkpoint")?
        .with_context(|| format!("no checkpoint under {}", config.storage.path.display()))?;
    let checkpoint = parse_and_verify(&bytes, &verifier).context("checkpoint does not verify")?;

    println!("origin: {}", checkpoint.origin);
    println!("size:   {}", checkpoint.size);
    println!("hash:   {}", STANDARD.encode(&checkpoint.hash));
    println!("        {}", hex::encode(&checkpoint.hash));
    for line in &checkpoint.extensions {
        println!("ext:    {line}");
    }
    Ok(())
}
