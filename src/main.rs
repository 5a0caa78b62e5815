//! Gateway worker CLI
//!
//! Runs one of the two workers, or a one-shot host that waits for a worker
//! and calls it.

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gateway_worker::bridge::{with_retry, CallbackBuilder, CallbackObject, Gateway, WorkerBridge};
use gateway_worker::config::{GatewayConfig, WorkerConfig};
use gateway_worker::harvest::{GetPapers, Harvester, PathLoader};
use gateway_worker::Result;

#[derive(Parser)]
#[command(name = "gateway-worker")]
#[command(author, version, about = "Gateway-registered harvest and embedding workers", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "worker.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "worker.toml")]
        output: String,
    },

    /// Serve getPapers
    Harvest {
        /// Gateway port
        #[arg(long)]
        port: Option<u16>,

        /// Callback listener port (0 for ephemeral)
        #[arg(long)]
        callback_port: Option<u16>,

        /// Corpus file or directory
        #[arg(long)]
        corpus: Option<PathBuf>,
    },

    /// Serve getVector
    Embed {
        /// Gateway port
        #[arg(long)]
        port: Option<u16>,

        /// Callback listener port (0 for ephemeral)
        #[arg(long)]
        callback_port: Option<u16>,

        /// Embedding model name
        #[arg(long)]
        model: Option<String>,
    },

    /// Act as the host: wait for a worker, call one method, print the result
    Call {
        /// Method name, e.g. getPapers or getVector
        method: String,

        /// Positional arguments; each is parsed as JSON, falling back to a string
        args: Vec<String>,

        /// Gateway port
        #[arg(long)]
        port: Option<u16>,

        /// Seconds to wait for a worker to register
        #[arg(long, default_value = "60")]
        timeout: u64,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: &str) -> Result<WorkerConfig> {
    if Path::new(path).exists() {
        info!("Loading configuration from: {}", path);
        WorkerConfig::load(path)
    } else {
        info!("Using default configuration");
        Ok(WorkerConfig::default())
    }
}

fn apply_ports(gateway: &mut GatewayConfig, port: Option<u16>, callback_port: Option<u16>) {
    if let Some(port) = port {
        gateway.port = port;
    }
    if let Some(callback_port) = callback_port {
        gateway.callback_port = callback_port;
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            info!("Initializing new worker configuration at: {}", output);
            WorkerConfig::default().save(&output)?;
            info!("Configuration saved successfully");
        }

        Commands::Harvest {
            port,
            callback_port,
            corpus,
        } => {
            let mut config = load_config(&cli.config)?;
            apply_ports(&mut config.gateway, port, callback_port);
            if let Some(corpus) = corpus {
                config.harvest.corpus_path = corpus;
            }

            let harvester = Arc::new(Harvester::new(Arc::new(PathLoader::new(
                config.harvest.corpus_path.clone(),
            ))));
            if config.harvest.preload {
                harvester.preload().await?;
            }

            let callback = CallbackBuilder::new(config.harvest.interface.clone())
                .method(Arc::new(GetPapers::new(harvester)))
                .build()?;
            serve(config.gateway, callback).await?;
        }

        Commands::Embed {
            port,
            callback_port,
            model,
        } => {
            let mut config = load_config(&cli.config)?;
            apply_ports(&mut config.gateway, port, callback_port);
            if let Some(model) = model {
                config.embedding.model = model;
            }

            let callback = embedding_callback(&config).await?;
            serve(config.gateway, callback).await?;
        }

        Commands::Call {
            method,
            args,
            port,
            timeout,
        } => {
            let mut config = load_config(&cli.config)?;
            apply_ports(&mut config.gateway, port, None);

            let gateway = Gateway::bind(config.gateway.gateway_addr()?).await?;
            info!("Waiting up to {}s for a worker to register...", timeout);
            let remote = gateway
                .accept_registration(Duration::from_secs(timeout))
                .await?;

            let args: Vec<JsonValue> = args
                .iter()
                .map(|a| serde_json::from_str(a).unwrap_or_else(|_| JsonValue::String(a.clone())))
                .collect();

            let output = with_retry(|| remote.call(&method, args.clone())).await?;
            println!("{}", output);
        }
    }

    Ok(())
}

#[cfg(feature = "local-embeddings")]
async fn embedding_callback(config: &WorkerConfig) -> Result<CallbackObject> {
    use gateway_worker::embedding::{FastEmbedder, GetVector};

    let embedding = config.embedding.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedder::new(&embedding)).await??;

    Ok(CallbackBuilder::new(config.embedding.interface.clone())
        .method(Arc::new(GetVector::new(Arc::new(embedder))))
        .build()?)
}

#[cfg(not(feature = "local-embeddings"))]
async fn embedding_callback(_config: &WorkerConfig) -> Result<CallbackObject> {
    Err(gateway_worker::Error::Config(
        "built without the local-embeddings feature".to_string(),
    ))
}

/// Register, then serve until the gateway goes away or Ctrl+C.
async fn serve(gateway: GatewayConfig, callback: CallbackObject) -> Result<()> {
    let serving = WorkerBridge::new(gateway, callback).register().await?;
    info!("Worker ready, press Ctrl+C to stop");

    tokio::select! {
        result = serving.serve() => result,
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    }
}
