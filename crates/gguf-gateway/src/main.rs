//! GGUF Gateway - a Docker/OCI registry front-end for GGUF models.
//!
//! Lets registry clients (e.g. `ollama pull host/namespace/repo:q4_k_m`) pull
//! GGUF files hosted on ModelScope. Manifests are synthesized on the fly and
//! model blobs are redirected to the upstream download URL.

mod handler;
mod server;

use anyhow::Result;
use clap::Parser;
use gguf_gateway_core::{Gateway, GatewayConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "gguf-gateway")]
#[command(about = "Registry front-end serving GGUF models from ModelScope")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// JSON config file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream model hub base URL
    #[arg(long)]
    upstream: Option<String>,

    /// Minutes to cache upstream responses
    #[arg(long)]
    cache_ttl_minutes: Option<u64>,

    /// Timeout for each upstream request, in seconds
    #[arg(long)]
    upstream_timeout_secs: Option<u64>,

    /// Start without loading chat templates
    #[arg(long)]
    no_templates: bool,
}

impl Args {
    fn gateway_config(&self) -> Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(upstream) = &self.upstream {
            config.upstream_base_url = upstream.clone();
        }
        if let Some(ttl) = self.cache_ttl_minutes {
            config.cache_ttl_minutes = ttl;
        }
        if let Some(timeout) = self.upstream_timeout_secs {
            config.upstream_timeout_secs = timeout;
        }
        if self.no_templates {
            config.template_sources.clear();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides --debug
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting GGUF Gateway");

    let config = args.gateway_config()?;
    info!(
        "Loading templates from {} sources",
        config.template_sources.len()
    );

    // Blocks until every template fetch has finished or failed.
    let gateway = Gateway::start(config).await?;

    let addr = server::start_server(gateway, &args.host, args.port).await?;
    info!("Registry running on {}", addr);

    // Print port for supervising processes to read
    println!("GATEWAY_PORT={}", addr.port());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
